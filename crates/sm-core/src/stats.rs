//! Aggregate counts for the statistics view.

use crate::models::Story;

/// Bucket used for stories registered without a product.
pub const NO_PRODUCT_LABEL: &str = "미입력";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoryStats {
    pub total: usize,
    pub by_author: Vec<CountEntry>,
    pub by_product: Vec<CountEntry>,
}

impl StoryStats {
    pub fn compute(stories: &[Story]) -> Self {
        Self {
            total: stories.len(),
            by_author: value_counts(stories.iter().map(|s| s.author.as_str())),
            by_product: value_counts(
                stories
                    .iter()
                    .map(|s| s.product.as_deref().unwrap_or(NO_PRODUCT_LABEL)),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Counts occurrences, most frequent first. Ties keep first-seen order.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = Vec::new();
    for value in values {
        match entries.iter_mut().find(|e| e.label == value) {
            Some(entry) => entry.count += 1,
            None => entries.push(CountEntry {
                label: value.to_string(),
                count: 1,
            }),
        }
    }
    // stable sort
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}
