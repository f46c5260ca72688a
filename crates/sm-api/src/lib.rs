//! # sm-api
//!
//! The web routing and orchestration layer for Story Market.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sm_core::export::CSV_FILE_NAME;
use sm_core::service::{StoryLinks, StoryService};
use sm_core::traits::QrEncoder;

use crate::session::{Session, SessionRegistry};

/// State shared across all requests.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub qr: Arc<dyn QrEncoder>,
    pub links: StoryLinks,
}

impl AppState {
    pub fn new(sessions: SessionRegistry, qr: Arc<dyn QrEncoder>, links: StoryLinks) -> Self {
        Self {
            sessions: Arc::new(sessions),
            qr,
            links,
        }
    }

    /// A service writing into the given session's store.
    pub fn story_service(&self, session: &Session) -> StoryService {
        StoryService::new(session.store.clone(), self.qr.clone(), self.links.clone())
    }
}

/// Builds the dashboard router.
///
/// Every view sits behind the session middleware; `/health` does not, so
/// probes never open sessions.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::register_form))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register_submit),
        )
        .route("/stories", get(handlers::list_stories))
        .route("/search", get(handlers::search))
        .route("/stats", get(handlers::stats))
        .route("/download", get(handlers::download_page))
        .route(&format!("/download/{CSV_FILE_NAME}"), get(handlers::download_csv))
        .route("/story/{id}", get(handlers::story_detail))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(middleware::content_security_policy())
        .layer(middleware::referrer_policy())
        .layer(middleware::nosniff())
        .layer(middleware::trace_layer())
        .with_state(state)
}
