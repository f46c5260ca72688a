//! Case-insensitive keyword search over title, content, author and product.

use crate::models::Story;

/// Returns the stories matching `keyword`, in the order given.
///
/// An empty keyword matches everything. Any other keyword, whitespace
/// included, is matched as typed.
pub fn search_stories<'a>(stories: &'a [Story], keyword: &str) -> Vec<&'a Story> {
    if keyword.is_empty() {
        return stories.iter().collect();
    }

    let needle = keyword.to_lowercase();
    stories.iter().filter(|s| matches(s, &needle)).collect()
}

fn matches(story: &Story, needle: &str) -> bool {
    [
        Some(story.title.as_str()),
        Some(story.content.as_str()),
        Some(story.author.as_str()),
        story.product.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}
