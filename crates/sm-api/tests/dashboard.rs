use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::Router;
use sm_api::session::{SessionRegistry, StoreFactory, SESSIONS_FULL_MESSAGE, SESSION_COOKIE};
use sm_api::{router, AppState};
use sm_core::error::AppError;
use sm_core::service::StoryLinks;
use sm_core::traits::{MockStoryStore, StoryStore};
use sm_qr_png::PngQrEncoder;
use sm_store_memory::InMemoryStoryStore;
use tower::util::ServiceExt;

fn app_with(factory: StoreFactory) -> Router {
    app_with_registry(SessionRegistry::new(factory, Duration::from_secs(3600)))
}

fn memory_factory() -> StoreFactory {
    Arc::new(|| Arc::new(InMemoryStoryStore::new()) as Arc<dyn StoryStore>)
}

fn app_with_registry(sessions: SessionRegistry) -> Router {
    router(AppState::new(
        sessions,
        Arc::new(PngQrEncoder::default()),
        StoryLinks::default(),
    ))
}

fn app() -> Router {
    app_with(memory_factory())
}

struct Page {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Drives the router like a browser would, carrying the session cookie.
struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    async fn get(&mut self, uri: &str) -> Page {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(req).await
    }

    async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Page {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn register(&mut self, title: &str, author: &str, content: &str, product: &str) -> Page {
        self.post_form(
            "/register",
            &[("title", title), ("author", author), ("product", product), ("content", content)],
        )
        .await
    }

    async fn send(&mut self, mut req: Request<Body>) -> Page {
        if let Some(cookie) = &self.cookie {
            req.headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        let res = self.app.clone().oneshot(req).await.unwrap();
        if let Some(set) = res.headers().get(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
            self.cookie = Some(pair);
        }
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        Page {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}

fn search_uri(keyword: &str) -> String {
    format!("/search?{}", serde_urlencoded::to_string(&[("q", keyword)][..]).unwrap())
}

fn csv_rows(body: &str) -> Vec<String> {
    body.trim_start_matches('\u{feff}')
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn landing_page_is_registration() {
    let mut browser = Browser::new(app());
    let page = browser.get("/").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<h2>이야기 등록</h2>"));
    assert!(page.body.contains("aria-current=\"page\">이야기 등록</a>"));
}

#[tokio::test]
async fn first_submission_opens_the_session() {
    let sessions = SessionRegistry::new(memory_factory(), Duration::from_secs(3600));
    let app = app_with_registry(sessions);
    let mut browser = Browser::new(app);

    for uri in ["/", "/stories", "/stats", "/download"] {
        let page = browser.get(uri).await;
        assert!(page.headers.get(header::SET_COOKIE).is_none(), "{uri}");
    }

    let res = browser.register("a", "b", "c", "").await;
    let cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));

    let again = browser.register("d", "e", "f", "").await;
    assert!(again.headers.get(header::SET_COOKIE).is_none());
    assert_eq!(again.headers.get(header::LOCATION).unwrap(), "/register?created=2");
}

#[tokio::test]
async fn full_registry_turns_new_visitors_away() {
    let sessions = SessionRegistry::new(memory_factory(), Duration::from_secs(3600)).with_max_sessions(1);
    let app = app_with_registry(sessions);
    let mut first = Browser::new(app.clone());
    let mut second = Browser::new(app);

    first.register("a", "b", "c", "").await;
    let refused = second.register("d", "e", "f", "").await;
    assert_eq!(refused.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(refused.body.contains(SESSIONS_FULL_MESSAGE));
    assert!(refused.headers.get(header::SET_COOKIE).is_none());

    assert!(second.get("/stories").await.body.contains("등록된 이야기가 없습니다."));
    let kept = first.register("g", "h", "i", "").await;
    assert_eq!(kept.headers.get(header::LOCATION).unwrap(), "/register?created=2");
}

#[tokio::test]
async fn registering_a_story_assigns_id_url_and_qr() {
    let mut browser = Browser::new(app());

    let res = browser
        .register("상자 이야기", "홍길동", "옛날 옛적에...", "손글씨 상자")
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.headers.get(header::LOCATION).unwrap(), "/register?created=1");

    let form = browser.get("/register?created=1").await;
    assert!(form.body.contains("이야기가 등록되었습니다!"));

    let csv = browser.get("/download/stories.csv").await;
    assert_eq!(csv.status, StatusCode::OK);
    let rows = csv_rows(&csv.body);
    assert_eq!(rows.len(), 1);
    let fields: Vec<&str> = rows[0].split(',').collect();
    assert_eq!(fields[0], "1");
    assert_eq!(&fields[1..5], ["상자 이야기", "홍길동", "옛날 옛적에...", "손글씨 상자"]);
    assert!(!fields[6].is_empty());
    assert_eq!(fields[7], "https://storymarket.example.com/story/1");
}

#[tokio::test]
async fn incomplete_submission_is_rejected_inline() {
    let mut browser = Browser::new(app());
    browser
        .register("상자 이야기", "홍길동", "옛날 옛적에...", "손글씨 상자")
        .await;

    let rejected = browser.register("두번째 이야기", "", "내용", "").await;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(rejected.body.contains("제목, 작성자, 이야기 내용은 필수 입력입니다."));
    assert!(rejected.body.contains("value=\"두번째 이야기\""));

    let csv = browser.get("/download/stories.csv").await;
    assert_eq!(csv_rows(&csv.body).len(), 1);
}

#[tokio::test]
async fn whitespace_only_fields_are_accepted() {
    let mut browser = Browser::new(app());
    let res = browser.register(" ", " ", " ", " ").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let csv = browser.get("/download/stories.csv").await;
    let rows = csv_rows(&csv.body);
    let fields: Vec<&str> = rows[0].split(',').map(|f| f.trim_matches('"')).collect();
    assert_eq!(&fields[1..5], [" ", " ", " ", " "]);
}

#[tokio::test]
async fn whitespace_keyword_is_searched_as_typed() {
    let mut browser = Browser::new(app());
    browser.register("상자 이야기", "홍길동", "옛날", "").await;
    browser.register("nospace", "anon", "x", "").await;

    let hits = browser.get(&search_uri(" ")).await;
    assert!(hits.body.contains("상자 이야기 - 홍길동"));
    assert!(!hits.body.contains("nospace - anon"));
}

#[tokio::test]
async fn missing_form_fields_count_as_empty() {
    let mut browser = Browser::new(app());
    let res = browser.post_form("/register", &[("title", "only a title")]).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body.matches("aria-invalid=\"true\"").count(), 2);
}

#[tokio::test]
async fn listing_is_most_recent_first() {
    let mut browser = Browser::new(app());
    for title in ["첫번째", "두번째", "세번째"] {
        browser.register(title, "작가", "내용", "").await;
    }

    let page = browser.get("/stories").await;
    let third = page.body.find("세번째 - 작가").unwrap();
    let second = page.body.find("두번째 - 작가").unwrap();
    let first = page.body.find("첫번째 - 작가").unwrap();
    assert!(third < second && second < first);
    assert_eq!(page.body.matches("data:image/png;base64,").count(), 3);
}

#[tokio::test]
async fn search_filters_the_session_store() {
    let mut browser = Browser::new(app());
    browser
        .register("상자 이야기", "홍길동", "옛날 옛적에...", "손글씨 상자")
        .await;
    browser
        .register("Blue Mug", "Alice", "A chipped handle", "")
        .await;

    let hits = browser.get(&search_uri("옛날")).await;
    assert_eq!(hits.status, StatusCode::OK);
    assert!(hits.body.contains("상자 이야기 - 홍길동"));
    assert!(!hits.body.contains("Blue Mug - Alice"));

    let caseless = browser.get("/search?q=bLuE").await;
    assert!(caseless.body.contains("Blue Mug - Alice"));
    assert!(!caseless.body.contains("상자 이야기 - 홍길동"));

    let everything = browser.get("/search").await;
    let first = everything.body.find("상자 이야기 - 홍길동").unwrap();
    let second = everything.body.find("Blue Mug - Alice").unwrap();
    assert!(first < second);

    let none = browser.get("/search?q=zzz").await;
    assert!(none.body.contains("검색 결과가 없습니다."));
}

#[tokio::test]
async fn statistics_count_authors_and_products() {
    let mut browser = Browser::new(app());
    browser.register("a", "홍길동", "c", "상자").await;
    browser.register("b", "홍길동", "c", "").await;
    browser.register("c", "Alice", "c", "상자").await;

    let page = browser.get("/stats").await;
    assert!(page.body.contains("총 등록 이야기 수: 3"));
    assert_eq!(page.body.matches("class=\"bar-row\"").count(), 2 + 2);
    assert!(page.body.contains("미입력"));
}

#[tokio::test]
async fn empty_store_shows_information_everywhere() {
    let mut browser = Browser::new(app());

    assert!(browser.get("/stories").await.body.contains("등록된 이야기가 없습니다."));
    assert!(browser.get("/search?q=x").await.body.contains("검색 결과가 없습니다."));
    assert!(browser.get("/stats").await.body.contains("통계 데이터가 없습니다."));

    let download = browser.get("/download").await;
    assert!(download.body.contains("다운로드할 데이터가 없습니다."));
    assert!(!download.body.contains("CSV 다운로드"));

    let csv = browser.get("/download/stories.csv").await;
    assert_eq!(csv.status, StatusCode::NOT_FOUND);
    assert!(csv.body.contains("다운로드할 데이터가 없습니다."));
}

#[tokio::test]
async fn csv_download_has_bom_and_attachment_headers() {
    let mut browser = Browser::new(app());
    browser.register("a", "b", "c", "").await;
    browser.register("d", "e", "f", "g").await;

    let page = browser.get("/download").await;
    assert!(page.body.contains("CSV 다운로드"));

    let csv = browser.get("/download/stories.csv").await;
    assert_eq!(
        csv.headers.get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        csv.headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"stories.csv\""
    );
    assert!(csv.body.starts_with("\u{feff}id,title,author,content,product,created_at,qr_code,url\n"));
    assert_eq!(csv_rows(&csv.body).len(), 2);
}

#[tokio::test]
async fn sessions_do_not_share_stories() {
    let app = app();
    let mut alice = Browser::new(app.clone());
    let mut bob = Browser::new(app);

    alice.register("앨리스의 이야기", "Alice", "c", "").await;
    bob.get("/").await;

    assert!(bob.get("/stories").await.body.contains("등록된 이야기가 없습니다."));
    let first_for_bob = bob.register("밥의 이야기", "Bob", "c", "").await;
    assert_eq!(
        first_for_bob.headers.get(header::LOCATION).unwrap(),
        "/register?created=1"
    );
    assert!(alice.get("/stories").await.body.contains("앨리스의 이야기"));
    assert!(!alice.get("/stories").await.body.contains("밥의 이야기"));
}

#[tokio::test]
async fn story_page_renders_known_ids_only() {
    let mut browser = Browser::new(app());
    browser.register("상자 이야기", "홍길동", "옛날 옛적에...", "").await;

    let page = browser.get("/story/1").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("상자 이야기 - 홍길동"));

    let missing = browser.get("/story/2").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body.contains("요청한 이야기를 찾을 수 없습니다."));
}

#[tokio::test]
async fn health_does_not_open_a_session() {
    let mut browser = Browser::new(app());
    let page = browser.get("/health").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.headers.get(header::SET_COOKIE).is_none());
    let body: serde_json::Value = serde_json::from_str(&page.body).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let mut browser = Browser::new(app());
    let page = browser.get("/register").await;
    assert_eq!(page.headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(page.headers.get(header::REFERRER_POLICY).unwrap(), "same-origin");
    let csp = page.headers.get(header::CONTENT_SECURITY_POLICY).unwrap().to_str().unwrap();
    assert!(csp.contains("img-src 'self' data:"));
}

#[tokio::test]
async fn unknown_paths_render_the_error_page() {
    let mut browser = Browser::new(app());
    let page = browser.get("/nope").await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(page.body.contains("오류 404"));
}

#[tokio::test]
async fn malformed_requests_render_the_error_page() {
    let mut browser = Browser::new(app());

    for uri in ["/register?created=abc", "/story/abc"] {
        let page = browser.get(uri).await;
        assert_eq!(page.status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(page.body.contains("잘못된 요청입니다."), "{uri}");
        assert!(page.body.contains("오류 400"), "{uri}");
    }

    let req = Request::builder()
        .method(Method::POST)
        .uri("/register")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("title=a"))
        .unwrap();
    let page = browser.send(req).await;
    assert_eq!(page.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(page.body.contains("잘못된 요청입니다."));
    assert_eq!(
        page.headers.get(header::CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );
}

#[tokio::test]
async fn store_failures_become_a_500_page() {
    let app = app_with(Arc::new(|| {
        let mut store = MockStoryStore::new();
        store
            .expect_list()
            .returning(|| Err(AppError::Internal("disk on fire".into())));
        Arc::new(store) as Arc<dyn StoryStore>
    }));
    let mut browser = Browser::new(app);

    let page = browser.get("/stories").await;
    assert_eq!(page.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(page.body.contains("일시적인 오류가 발생했습니다."));
    assert!(!page.body.contains("disk on fire"));
}
