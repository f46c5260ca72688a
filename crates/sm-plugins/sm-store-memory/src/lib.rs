//! # sm-store-memory
//!
//! In-process implementation of `StoryStore`. Nothing survives a restart.

use async_trait::async_trait;
use sm_core::error::{AppError, Result};
use sm_core::models::{Story, StoryId};
use sm_core::traits::StoryStore;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStoryStore {
    stories: RwLock<Vec<Story>>,
}

impl InMemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    async fn len(&self) -> Result<usize> {
        Ok(self.stories.read().await.len())
    }

    /// The length check and the push happen under one write lock, so two
    /// writers that computed the same id cannot both succeed.
    async fn append(&self, story: Story) -> Result<()> {
        let mut stories = self.stories.write().await;
        let expected = StoryId::after(stories.len());
        if story.id != expected {
            tracing::debug!(got = %story.id, %expected, "rejected out-of-sequence story");
            return Err(AppError::Conflict(format!(
                "story id {} is not next in sequence (expected {})",
                story.id, expected
            )));
        }
        stories.push(story);
        Ok(())
    }

    async fn get(&self, id: StoryId) -> Result<Option<Story>> {
        // ids are dense from 1, so the id doubles as a position
        let index = match id.get().checked_sub(1) {
            Some(i) => i as usize,
            None => return Ok(None),
        };
        Ok(self.stories.read().await.get(index).cloned())
    }

    async fn list(&self) -> Result<Vec<Story>> {
        Ok(self.stories.read().await.clone())
    }
}
