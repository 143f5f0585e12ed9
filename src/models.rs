//! Core data models used throughout Book Explorer.
//!
//! These types represent the book records, candidate lists, match results,
//! and chat messages that flow between the dataset loader, the lookup index,
//! the fuzzy resolver, and the CLI.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Placeholder shown for any field that is missing from the schema or null
/// in a given row.
pub const PLACEHOLDER: &str = "N/A";

/// A displayable column of the book dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Author,
    Genre,
    Publisher,
    PublishedDate,
    Pages,
    AverageRating,
    Description,
    Thumbnail,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Author,
        Field::Genre,
        Field::Publisher,
        Field::PublishedDate,
        Field::Pages,
        Field::AverageRating,
        Field::Description,
        Field::Thumbnail,
    ];

    /// Header name of this field in the CSV file.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Genre => "genre",
            Field::Publisher => "publisher",
            Field::PublishedDate => "published_date",
            Field::Pages => "pages",
            Field::AverageRating => "average_rating",
            Field::Description => "description",
            Field::Thumbnail => "thumbnail",
        }
    }

    /// Human-readable label used in CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Author => "Author",
            Field::Genre => "Genre",
            Field::Publisher => "Publisher",
            Field::PublishedDate => "Published Date",
            Field::Pages => "Pages",
            Field::AverageRating => "Average Rating",
            Field::Description => "Description",
            Field::Thumbnail => "Thumbnail",
        }
    }

    pub fn from_column(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One row of the dataset. Identity is the row's position in the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookRecord {
    pub row: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub pages: Option<String>,
    pub average_rating: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl BookRecord {
    /// Raw value of a field, `None` when missing or null.
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Title => &self.title,
            Field::Author => &self.author,
            Field::Genre => &self.genre,
            Field::Publisher => &self.publisher,
            Field::PublishedDate => &self.published_date,
            Field::Pages => &self.pages,
            Field::AverageRating => &self.average_rating,
            Field::Description => &self.description,
            Field::Thumbnail => &self.thumbnail,
        };
        value.as_deref()
    }

    /// Display value of a field, [`PLACEHOLDER`] when missing or null.
    pub fn field(&self, field: Field) -> &str {
        self.get(field).unwrap_or(PLACEHOLDER)
    }

    pub(crate) fn set(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::Genre => &mut self.genre,
            Field::Publisher => &mut self.publisher,
            Field::PublishedDate => &mut self.published_date,
            Field::Pages => &mut self.pages,
            Field::AverageRating => &mut self.average_rating,
            Field::Description => &mut self.description,
            Field::Thumbnail => &mut self.thumbnail,
        };
        *slot = value;
    }

    /// Numeric rating, `None` when missing or not a finite number.
    /// `inf` and `NaN` parse as floats but are treated as unrated.
    pub fn rating(&self) -> Option<f64> {
        self.average_rating
            .as_deref()
            .and_then(|r| r.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite())
    }

    /// Thumbnail URL if it looks like one.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail.as_deref().filter(|t| t.starts_with("http"))
    }
}

/// Which candidate list a match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Title,
    Author,
    Genre,
}

impl CandidateKind {
    pub fn field(&self) -> Field {
        match self {
            CandidateKind::Title => Field::Title,
            CandidateKind::Author => Field::Author,
            CandidateKind::Genre => Field::Genre,
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field().column())
    }
}

/// Best candidate for a query, with its similarity score in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub candidate: String,
    pub score: f64,
    pub kind: CandidateKind,
}

/// Who sent a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
