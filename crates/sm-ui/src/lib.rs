//! # sm-ui
//!
//! Askama templates for the five dashboard views, plus the view models they
//! render. Handlers build these from `sm-core` types and call `render()`.

use askama::Template;
use sm_core::models::{RequiredField, Story, StoryForm, ValidationErrors};
use sm_core::stats::{CountEntry, StoryStats};

/// The sidebar menu entries, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Register,
    List,
    Search,
    Stats,
    Download,
}

impl View {
    pub const ALL: [View; 5] = [View::Register, View::List, View::Search, View::Stats, View::Download];

    pub fn label(self) -> &'static str {
        match self {
            View::Register => "이야기 등록",
            View::List => "이야기 목록",
            View::Search => "스토리 검색",
            View::Stats => "통계",
            View::Download => "데이터 다운로드",
        }
    }

    pub fn href(self) -> &'static str {
        match self {
            View::Register => "/register",
            View::List => "/stories",
            View::Search => "/search",
            View::Stats => "/stats",
            View::Download => "/download",
        }
    }
}

pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub active: bool,
}

pub struct Nav {
    pub items: Vec<NavItem>,
}

impl Nav {
    /// `None` renders the menu with nothing highlighted (story and error pages).
    pub fn new(active: Option<View>) -> Self {
        let items = View::ALL
            .into_iter()
            .map(|view| NavItem {
                label: view.label(),
                href: view.href(),
                active: Some(view) == active,
            })
            .collect();
        Self { items }
    }
}

/// A story flattened for display. An empty `product` means none was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryCard {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub content: String,
    pub product: String,
    pub created_at: String,
    pub qr_code: String,
    pub url: String,
}

impl From<&Story> for StoryCard {
    fn from(story: &Story) -> Self {
        Self {
            id: story.id.get(),
            title: story.title.clone(),
            author: story.author.clone(),
            content: story.content.clone(),
            product: story.product.clone().unwrap_or_default(),
            created_at: story.created_at_display(),
            qr_code: story.qr_code.clone(),
            url: story.url.clone(),
        }
    }
}

pub fn cards<'a>(stories: impl IntoIterator<Item = &'a Story>) -> Vec<StoryCard> {
    stories.into_iter().map(StoryCard::from).collect()
}

/// One row of a horizontal bar chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub label: String,
    pub count: usize,
    /// Width relative to the largest bar, 0..=100.
    pub percent: usize,
}

pub fn bars(entries: &[CountEntry]) -> Vec<Bar> {
    let max = entries.iter().map(|e| e.count).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| Bar {
            label: e.label.clone(),
            count: e.count,
            percent: if max == 0 { 0 } else { e.count * 100 / max },
        })
        .collect()
}

/// Registration form contents plus which inputs failed validation.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub values: StoryForm,
    pub invalid: Vec<RequiredField>,
}

impl FormState {
    pub fn rejected(values: StoryForm, errors: &ValidationErrors) -> Self {
        Self {
            values,
            invalid: errors.missing.clone(),
        }
    }

    pub fn is_invalid(&self, input_name: &str) -> bool {
        self.invalid.iter().any(|f| f.input_name() == input_name)
    }
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub form: FormState,
    /// Success message; empty when there is none.
    pub notice: String,
    /// Validation message; empty when there is none.
    pub error: String,
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListTemplate {
    pub nav: Nav,
    /// Most recent first.
    pub stories: Vec<StoryCard>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub nav: Nav,
    pub keyword: String,
    pub results: Vec<StoryCard>,
}

#[derive(Template)]
#[template(path = "stats.html")]
pub struct StatsTemplate {
    pub nav: Nav,
    pub total: usize,
    pub authors: Vec<Bar>,
    pub products: Vec<Bar>,
}

impl StatsTemplate {
    pub fn new(stats: &StoryStats) -> Self {
        Self {
            nav: Nav::new(Some(View::Stats)),
            total: stats.total,
            authors: bars(&stats.by_author),
            products: bars(&stats.by_product),
        }
    }
}

#[derive(Template)]
#[template(path = "download.html")]
pub struct DownloadTemplate {
    pub nav: Nav,
    pub count: usize,
    pub file_name: &'static str,
}

#[derive(Template)]
#[template(path = "story.html")]
pub struct StoryTemplate {
    pub nav: Nav,
    pub story: StoryCard,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Nav,
    pub status: u16,
    pub message: String,
}
