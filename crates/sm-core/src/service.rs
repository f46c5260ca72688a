//! # Story Service
//!
//! Turns a validated submission into a stored `Story`: id, canonical URL,
//! QR code and timestamp.

use std::sync::Arc;

use chrono::{Local, Timelike};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{NewStory, Story, StoryId};
use crate::traits::{QrEncoder, StoryStore};

pub const DEFAULT_STORY_BASE_URL: &str = "https://storymarket.example.com";

/// How many times `add_story` re-reads the store after losing an id race.
const MAX_APPEND_ATTEMPTS: usize = 3;

/// Builds the public URL of a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryLinks {
    base: String,
}

impl StoryLinks {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `"<base>/story/<id>"`
    pub fn story_url(&self, id: StoryId) -> String {
        format!("{}/story/{}", self.base, id)
    }
}

impl Default for StoryLinks {
    fn default() -> Self {
        Self::new(DEFAULT_STORY_BASE_URL)
    }
}

pub struct StoryService {
    store: Arc<dyn StoryStore>,
    qr: Arc<dyn QrEncoder>,
    links: StoryLinks,
}

impl StoryService {
    pub fn new(store: Arc<dyn StoryStore>, qr: Arc<dyn QrEncoder>, links: StoryLinks) -> Self {
        Self { store, qr, links }
    }

    /// Registers a story with `id = len + 1` and returns the stored record.
    pub async fn add_story(&self, new: NewStory) -> Result<Story> {
        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let id = StoryId::after(self.store.len().await?);
            let url = self.links.story_url(id);
            let qr_code = self.qr.encode_png_base64(&url)?;

            let story = Story {
                id,
                title: new.title.clone(),
                author: new.author.clone(),
                content: new.content.clone(),
                product: new.product.clone(),
                created_at: now_to_the_second(),
                qr_code,
                url,
            };

            match self.store.append(story.clone()).await {
                Ok(()) => {
                    info!(story_id = %story.id, author = %story.author, "story registered");
                    return Ok(story);
                }
                Err(AppError::Conflict(reason)) => {
                    warn!(attempt, story_id = %id, %reason, "story id already taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(format!(
            "could not assign a story id after {MAX_APPEND_ATTEMPTS} attempts"
        )))
    }
}

fn now_to_the_second() -> chrono::NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
