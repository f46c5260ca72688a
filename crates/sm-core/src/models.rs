//! # Domain Models
//!
//! A `Story` is the only entity. Everything else in this module exists to get
//! a submission from the registration form into a `Story` safely.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::error::AppError;

/// `created_at` is shown and exported in this shape.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shown inline when the registration form is incomplete.
pub const REQUIRED_FIELDS_MESSAGE: &str = "제목, 작성자, 이야기 내용은 필수 입력입니다.";

/// Sequential story identifier, dense and starting at 1 within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u64);

impl StoryId {
    /// The id a store hands out after holding `len` stories.
    pub fn after(len: usize) -> Self {
        StoryId(len as u64 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered story. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub author: String,
    pub content: String,
    /// Name of the marketplace item the story belongs to, if any.
    pub product: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: NaiveDateTime,
    /// Base64 PNG of a QR code pointing at `url`.
    pub qr_code: String,
    pub url: String,
}

impl Story {
    pub fn created_at_display(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

/// Raw registration form. Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryForm {
    pub title: String,
    pub author: String,
    pub product: String,
    pub content: String,
}

impl StoryForm {
    /// Checks the three required fields are non-empty. An empty product
    /// becomes `None`; whitespace counts as content everywhere.
    pub fn validate(&self) -> Result<NewStory, ValidationErrors> {
        let missing: Vec<RequiredField> = [
            (RequiredField::Title, &self.title),
            (RequiredField::Author, &self.author),
            (RequiredField::Content, &self.content),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(ValidationErrors { missing });
        }

        let product = if self.product.is_empty() {
            None
        } else {
            Some(self.product.clone())
        };

        Ok(NewStory {
            title: self.title.clone(),
            author: self.author.clone(),
            content: self.content.clone(),
            product,
        })
    }
}

/// A submission that passed validation. Only `StoryForm::validate` builds one,
/// so holding a `NewStory` means the required fields are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) content: String,
    pub(crate) product: Option<String>,
}

impl NewStory {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Title,
    Author,
    Content,
}

impl RequiredField {
    pub fn label(self) -> &'static str {
        match self {
            RequiredField::Title => "제목",
            RequiredField::Author => "작성자",
            RequiredField::Content => "이야기 내용",
        }
    }

    /// Name of the form input carrying this field.
    pub fn input_name(self) -> &'static str {
        match self {
            RequiredField::Title => "title",
            RequiredField::Author => "author",
            RequiredField::Content => "content",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", REQUIRED_FIELDS_MESSAGE)]
pub struct ValidationErrors {
    pub missing: Vec<RequiredField>,
}

impl ValidationErrors {
    pub fn is_missing(&self, field: RequiredField) -> bool {
        self.missing.contains(&field)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        let fields: Vec<&str> = e.missing.iter().map(|f| f.input_name()).collect();
        AppError::ValidationError(format!("missing required fields: {}", fields.join(", ")))
    }
}
