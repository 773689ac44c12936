/// Shared data structures for the library state
///
/// These structs represent the data model that flows between
/// the catalog database, the synchronizer and the presentation layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier of a book (the catalog UUID)
pub type BookId = String;

/// Represents a single downloadable book in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique catalog ID, stable across mutations
    pub id: BookId,
    /// Display title
    pub title: String,
    /// Language name used for grouping (None if the catalog omitted it)
    pub language: Option<String>,
    /// True once the archive is present on this device
    #[serde(default)]
    pub is_local: bool,
    /// True if the archive was built without pictures (None if unknown)
    #[serde(default)]
    pub is_no_pic: Option<bool>,
    /// Raw favicon image bytes
    #[serde(default)]
    pub favicon: Option<Vec<u8>>,
    /// Archive size in bytes
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub article_count: Option<u64>,
    /// Publication date of the archive
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Canonical ordering key: language name, then title, then id.
///
/// Books without a language sort first, matching SQLite's NULL ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey<'a> {
    pub language: Option<&'a str>,
    pub title: &'a str,
    pub id: &'a str,
}

/// A catalog language and whether the user wants it in the online list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub name: String,
    pub is_displayed: bool,
    pub book_count: u64,
}

/// Whether local storage suffices for downloading a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceState {
    Enough,
    Caution,
    NotEnough,
}

impl Book {
    /// Create a book with only the fields the synchronizer cares about
    pub fn new(id: impl Into<BookId>, language: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            language: Some(language.into()),
            is_local: false,
            is_no_pic: None,
            favicon: None,
            file_size: 0,
            article_count: None,
            date: None,
            creator: None,
            description: None,
        }
    }

    pub fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            language: self.language.as_deref(),
            title: &self.title,
            id: &self.id,
        }
    }

    /// True if both books occupy the same slot in the canonical order.
    /// The id is identical for the same entity, so only language and title matter.
    pub fn same_position_key(&self, other: &Book) -> bool {
        self.language == other.language && self.title == other.title
    }

    /// Name of the section this book is grouped under, if it has a usable language
    pub fn section_name(&self) -> Option<&str> {
        self.language.as_deref().filter(|name| !name.trim().is_empty())
    }

    /// One-line summary: date, size and article count
    pub fn detailed_description(&self) -> String {
        let mut parts = Vec::new();
        if let Some(date) = self.date {
            parts.push(date.format("%Y-%m-%d").to_string());
        }
        if self.file_size > 0 {
            parts.push(format_file_size(self.file_size));
        }
        if let Some(count) = self.article_count {
            parts.push(format!("{} articles", format_count(count)));
        }
        parts.join(", ")
    }

    /// Expanded summary shown when the user taps a row
    pub fn very_detailed_description(&self) -> String {
        let mut lines = vec![self.detailed_description()];
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(description.to_string());
        }
        if let Some(creator) = self.creator.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("Creator: {}", creator));
        }
        lines.retain(|line| !line.is_empty());
        lines.join("\n")
    }
}

/// Human readable byte count (1000-based, like the system file size formatter)
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Abbreviated count: 950, 12K, 1.5M
pub fn format_count(count: u64) -> String {
    match count {
        0..=999 => count.to_string(),
        1_000..=999_999 => format!("{}K", count / 1_000),
        _ => format!("{:.1}M", count as f64 / 1_000_000.0),
    }
}
