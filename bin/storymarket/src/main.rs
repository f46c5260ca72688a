//! # Story Market Binary
//!
//! The entry point that assembles the dashboard based on compile-time features.

use std::sync::Arc;

use sm_api::session::{SessionRegistry, StoreFactory};
use sm_api::AppState;
use sm_config::{LogFormat, LogSettings, Settings};
use sm_core::service::StoryLinks;
use sm_core::traits::{QrEncoder, StoryStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "store-memory")]
use sm_store_memory::InMemoryStoryStore;

#[cfg(feature = "qr-png")]
use sm_qr_png::PngQrEncoder;

#[cfg(not(all(feature = "store-memory", feature = "qr-png")))]
compile_error!("storymarket needs a story store and a QR encoder: enable `store-memory` and `qr-png`");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    // 1. Story storage, one store per browser session
    #[cfg(feature = "store-memory")]
    let factory: StoreFactory = Arc::new(|| Arc::new(InMemoryStoryStore::new()) as Arc<dyn StoryStore>);

    // 2. QR rendering
    #[cfg(feature = "qr-png")]
    let qr: Arc<dyn QrEncoder> = Arc::new(PngQrEncoder::new(settings.qr.module_px, settings.qr.quiet_zone));

    let sessions = SessionRegistry::new(factory, settings.session.idle_timeout())
        .with_max_sessions(settings.session.max_sessions);
    let state = AppState::new(sessions, qr, StoryLinks::new(settings.story.base_url.clone()));
    let app = sm_api::router(state);

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        story_base_url = %settings.story.base_url,
        "storymarket listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down; all stories are discarded");
        })
        .await?;

    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
