/// Book filters
///
/// A filter decides which catalog books belong in a synchronized view.
/// Evaluation may fail for malformed entries; such books are excluded and
/// the failure is reported back to the caller as a warning.

use std::collections::BTreeSet;

use super::data::Book;
use crate::error::FilterError;

/// Predicate over catalog books
pub trait BookFilter {
    fn evaluate(&self, book: &Book) -> Result<bool, FilterError>;
}

impl<F> BookFilter for F
where
    F: Fn(&Book) -> Result<bool, FilterError>,
{
    fn evaluate(&self, book: &Book) -> Result<bool, FilterError> {
        self(book)
    }
}

/// Filter for the "available for download" list.
///
/// A book passes if it is not on the device yet and, when the user picked
/// any displayed languages, its language is one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlineFilter {
    displayed_languages: BTreeSet<String>,
}

impl OnlineFilter {
    pub fn new<I, S>(displayed_languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            displayed_languages: displayed_languages.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter that lets every language through
    pub fn all_languages() -> Self {
        Self::default()
    }

    pub fn displayed_languages(&self) -> &BTreeSet<String> {
        &self.displayed_languages
    }
}

impl BookFilter for OnlineFilter {
    fn evaluate(&self, book: &Book) -> Result<bool, FilterError> {
        let language = book.section_name().ok_or_else(|| FilterError::InconsistentFilter {
            id: book.id.clone(),
            reason: "missing language name".to_string(),
        })?;

        if !self.displayed_languages.is_empty() && !self.displayed_languages.contains(language) {
            return Ok(false);
        }

        Ok(!book.is_local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_preference_passes_all_languages() {
        let filter = OnlineFilter::all_languages();
        assert_eq!(filter.evaluate(&Book::new("1", "en", "A")), Ok(true));
        assert_eq!(filter.evaluate(&Book::new("2", "fr", "B")), Ok(true));
    }

    #[test]
    fn test_displayed_languages_restrict() {
        let filter = OnlineFilter::new(["fr"]);
        assert_eq!(filter.evaluate(&Book::new("1", "en", "A")), Ok(false));
        assert_eq!(filter.evaluate(&Book::new("2", "fr", "B")), Ok(true));
    }

    #[test]
    fn test_local_books_are_excluded() {
        let mut book = Book::new("1", "en", "A");
        book.is_local = true;
        assert_eq!(OnlineFilter::all_languages().evaluate(&book), Ok(false));
    }

    #[test]
    fn test_missing_language_is_an_error() {
        let mut book = Book::new("1", "en", "A");
        book.language = None;
        let result = OnlineFilter::all_languages().evaluate(&book);
        assert!(matches!(
            result,
            Err(FilterError::InconsistentFilter { ref id, .. }) if id == "1"
        ));
    }

    #[test]
    fn test_closures_are_filters() {
        let titles_with_a =
            |book: &Book| -> Result<bool, FilterError> { Ok(book.title.starts_with('A')) };
        assert_eq!(titles_with_a.evaluate(&Book::new("1", "en", "Atlas")), Ok(true));
        assert_eq!(titles_with_a.evaluate(&Book::new("2", "en", "Bible")), Ok(false));
    }
}
