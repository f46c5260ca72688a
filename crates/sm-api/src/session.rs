//! # Sessions
//!
//! Each browser gets its own story collection, identified by a cookie. A
//! session is opened by the first write (POST); read-only requests without a
//! live session see an empty, unregistered collection. The middleware hands
//! the session to handlers via request extensions.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use sm_core::traits::StoryStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "storymarket_session";
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const SESSIONS_FULL_MESSAGE: &str = "지금은 새 이야기를 받을 수 없습니다. 잠시 후 다시 시도해 주세요.";

/// Upper bound on how often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Creates the store backing a freshly opened session.
pub type StoreFactory = Arc<dyn Fn() -> Arc<dyn StoryStore> + Send + Sync>;

/// The current request's session, available as `Extension<Session>`.
#[derive(Clone)]
pub struct Session {
    /// `Uuid::nil()` for a detached session.
    pub id: Uuid,
    pub store: Arc<dyn StoryStore>,
}

impl Session {
    /// True when the session is not held by the registry.
    pub fn is_detached(&self) -> bool {
        self.id.is_nil()
    }
}

struct SessionEntry {
    store: Arc<dyn StoryStore>,
    last_seen: Instant,
}

pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionEntry>,
    factory: StoreFactory,
    idle_timeout: Duration,
    max_sessions: usize,
    last_sweep: Mutex<Instant>,
}

impl SessionRegistry {
    pub fn new(factory: StoreFactory, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            factory,
            idle_timeout,
            max_sessions: DEFAULT_MAX_SESSIONS,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Returns the live session `id` and marks it as seen. Unknown or
    /// expired ids give `None`; they are never revived.
    pub fn find(&self, id: Uuid) -> Option<Session> {
        let mut entry = self.sessions.get_mut(&id)?;
        if entry.last_seen.elapsed() >= self.idle_timeout {
            return None;
        }
        entry.last_seen = Instant::now();
        Some(Session {
            id,
            store: entry.store.clone(),
        })
    }

    /// Registers a new session, or `None` when the registry is full.
    pub fn open(&self) -> Option<Session> {
        self.sweep_idle();
        if self.sessions.len() >= self.max_sessions {
            warn!(max = self.max_sessions, "session registry full");
            return None;
        }

        let id = Uuid::new_v4();
        let store = (self.factory)();
        self.sessions.insert(
            id,
            SessionEntry {
                store: store.clone(),
                last_seen: Instant::now(),
            },
        );
        info!(session = %id, active = self.sessions.len(), "session opened");
        Some(Session { id, store })
    }

    /// An empty session that is never registered.
    pub fn detached(&self) -> Session {
        Session {
            id: Uuid::nil(),
            store: (self.factory)(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every session idle for longer than the timeout, at most once per
    /// sweep interval.
    fn sweep_idle(&self) {
        let interval = self.idle_timeout.min(SWEEP_INTERVAL);
        {
            let Ok(mut last) = self.last_sweep.try_lock() else {
                return;
            };
            if last.elapsed() < interval {
                return;
            }
            *last = Instant::now();
        }

        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions.retain(|_, entry| entry.last_seen.elapsed() < timeout);
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            debug!(dropped, "expired idle sessions");
        }
    }
}

/// Reads the session id out of the `Cookie` headers, if present and well formed.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let found = session_id_from_headers(req.headers()).and_then(|id| state.sessions.find(id));
    let (session, opened) = match found {
        Some(session) => (session, false),
        None if req.method() == Method::POST => match state.sessions.open() {
            Some(session) => (session, true),
            None => {
                return ApiError::new(StatusCode::SERVICE_UNAVAILABLE, SESSIONS_FULL_MESSAGE).into_response()
            }
        },
        None => (state.sessions.detached(), false),
    };
    let id = session.id;
    req.extensions_mut().insert(session);

    let mut res = next.run(req).await;
    if opened {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(id)) {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    res
}
