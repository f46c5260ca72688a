//! # sm-config
//!
//! Layered settings: built-in defaults, an optional config file, `.env`, then
//! `STORYMARKET__SECTION__KEY` environment variables (highest priority).

use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File, Source};
use config::builder::DefaultState;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "STORYMARKET";
/// Overrides the config file location.
pub const CONFIG_PATH_VAR: &str = "STORYMARKET_CONFIG";
/// Looked up without extension, so `.toml`, `.yaml` and `.json` all work.
pub const DEFAULT_CONFIG_FILE: &str = "config/storymarket";

const MAX_MODULE_PX: u32 = 64;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub story: StorySettings,
    pub qr: QrSettings,
    pub session: SessionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorySettings {
    /// Prefix of every story URL encoded into a QR code.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QrSettings {
    pub module_px: u32,
    pub quiet_zone: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub idle_minutes: u64,
    /// Sessions held at once; new visitors are turned away beyond this.
    pub max_sessions: usize,
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_minutes * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Settings {
    /// Reads `.env`, the config file and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(SettingsError::Invalid(format!(".env: {e}")));
            }
        }

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(File::with_name(&path).required(false), environment())
    }

    /// Builds settings from a file-like source and an environment source on
    /// top of the defaults.
    pub fn from_sources<F>(file: F, env: Environment) -> Result<Self, SettingsError>
    where
        F: Source + Send + Sync + 'static,
    {
        let settings: Settings = defaults()?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        tracing::debug!(?settings, "configuration loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let base = &self.story.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(SettingsError::Invalid(format!(
                "story.base_url must start with http:// or https://, got {base:?}"
            )));
        }
        if self.qr.module_px == 0 || self.qr.module_px > MAX_MODULE_PX {
            return Err(SettingsError::Invalid(format!(
                "qr.module_px must be between 1 and {MAX_MODULE_PX}, got {}",
                self.qr.module_px
            )));
        }
        if self.session.idle_minutes == 0 {
            return Err(SettingsError::Invalid("session.idle_minutes must be positive".into()));
        }
        if self.session.max_sessions == 0 {
            return Err(SettingsError::Invalid("session.max_sessions must be positive".into()));
        }
        Ok(())
    }
}

/// `STORYMARKET__SERVER__PORT=9000` sets `server.port`.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080_i64)?
        .set_default("story.base_url", "https://storymarket.example.com")?
        .set_default("qr.module_px", 10_i64)?
        .set_default("qr.quiet_zone", true)?
        .set_default("session.idle_minutes", 120_i64)?
        .set_default("session.max_sessions", 10_000_i64)?
        .set_default("log.filter", "info,tower_http=info")?
        .set_default("log.format", "pretty")
}
