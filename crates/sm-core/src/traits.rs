//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Story, StoryId};

/// Ordered, append-only story collection owned by one session.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Appends a story. Fails with `AppError::Conflict` unless
    /// `story.id == StoryId::after(len)`, which keeps ids dense.
    async fn append(&self, story: Story) -> Result<()>;

    async fn get(&self, id: StoryId) -> Result<Option<Story>>;

    /// Every story in insertion order.
    async fn list(&self) -> Result<Vec<Story>>;
}

/// Turns a URL into an embeddable QR image.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait QrEncoder: Send + Sync {
    /// Returns the PNG bytes of the QR code, base64 encoded.
    fn encode_png_base64(&self, data: &str) -> Result<String>;
}
