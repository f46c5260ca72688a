//! # sm-api Handlers
//!
//! One handler per view. Each reads the session's store afresh and returns
//! rendered HTML.

use askama::Template;
use axum::extract::rejection::{FormRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use sm_core::error::AppError;
use sm_core::export::{export_csv, CSV_CONTENT_TYPE, CSV_FILE_NAME};
use sm_core::models::{StoryForm, StoryId};
use sm_core::search::search_stories;
use sm_core::stats::StoryStats;
use sm_ui::{
    cards, DownloadTemplate, FormState, ListTemplate, Nav, RegisterTemplate, SearchTemplate,
    StatsTemplate, StoryCard, StoryTemplate, View,
};
use tracing::info;

use crate::error::ApiError;
use crate::session::Session;
use crate::AppState;

pub const CREATED_NOTICE: &str = "이야기가 등록되었습니다!";
pub const EMPTY_DOWNLOAD_MESSAGE: &str = "다운로드할 데이터가 없습니다.";

fn render<T: Template>(template: &T) -> Result<Html<String>, ApiError> {
    Ok(Html(template.render()?))
}

#[derive(Debug, Deserialize)]
pub struct RegisterQuery {
    /// Set by the redirect after a successful submission.
    pub created: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Renders the registration form (also the landing page).
pub async fn register_form(
    query: Result<Query<RegisterQuery>, QueryRejection>,
) -> Result<Html<String>, ApiError> {
    let Query(query) = query?;
    let notice = match query.created {
        Some(_) => CREATED_NOTICE.to_string(),
        None => String::new(),
    };
    render(&RegisterTemplate {
        nav: Nav::new(Some(View::Register)),
        form: FormState::default(),
        notice,
        error: String::new(),
    })
}

/// Validates and stores a submission, then redirects back to the form.
pub async fn register_submit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    form: Result<Form<StoryForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(form) = form?;
    match form.validate() {
        Ok(new_story) => {
            let story = state.story_service(&session).add_story(new_story).await?;
            Ok(Redirect::to(&format!("/register?created={}", story.id)).into_response())
        }
        Err(errors) => {
            info!(session = %session.id, missing = ?errors.missing, "registration rejected");
            let page = RegisterTemplate {
                nav: Nav::new(Some(View::Register)),
                error: errors.to_string(),
                form: FormState::rejected(form, &errors),
                notice: String::new(),
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&page)?).into_response())
        }
    }
}

/// All stories, most recent first.
pub async fn list_stories(Extension(session): Extension<Session>) -> Result<Html<String>, ApiError> {
    let stories = session.store.list().await?;
    render(&ListTemplate {
        nav: Nav::new(Some(View::List)),
        stories: cards(stories.iter().rev()),
    })
}

pub async fn search(
    Extension(session): Extension<Session>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Html<String>, ApiError> {
    let Query(query) = query?;
    let stories = session.store.list().await?;
    let results = search_stories(&stories, &query.q);
    render(&SearchTemplate {
        nav: Nav::new(Some(View::Search)),
        results: cards(results),
        keyword: query.q,
    })
}

pub async fn stats(Extension(session): Extension<Session>) -> Result<Html<String>, ApiError> {
    let stories = session.store.list().await?;
    render(&StatsTemplate::new(&StoryStats::compute(&stories)))
}

pub async fn download_page(Extension(session): Extension<Session>) -> Result<Html<String>, ApiError> {
    let count = session.store.len().await?;
    render(&DownloadTemplate {
        nav: Nav::new(Some(View::Download)),
        count,
        file_name: CSV_FILE_NAME,
    })
}

/// The whole collection as `stories.csv`. An empty store has nothing to offer.
pub async fn download_csv(Extension(session): Extension<Session>) -> Result<Response, ApiError> {
    let stories = session.store.list().await?;
    if stories.is_empty() {
        return Err(ApiError::not_found(EMPTY_DOWNLOAD_MESSAGE));
    }

    let body = export_csv(&stories)?;
    info!(session = %session.id, rows = stories.len(), "csv exported");
    let headers = [
        (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{CSV_FILE_NAME}\""),
        ),
    ];
    Ok((headers, body).into_response())
}

/// A single story; this is where the QR code points when the base URL is ours.
pub async fn story_detail(
    Extension(session): Extension<Session>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Html<String>, ApiError> {
    let Path(id) = id?;
    let story = session
        .store
        .get(StoryId(id))
        .await?
        .ok_or_else(|| AppError::NotFound("story".into(), id.to_string()))?;
    render(&StoryTemplate {
        nav: Nav::new(None),
        story: StoryCard::from(&story),
    })
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("페이지를 찾을 수 없습니다.")
}
