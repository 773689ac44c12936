/// Presentation state owned by the list screen
///
/// Everything here lives next to the synchronizer rather than inside it:
/// which rows are expanded, how a row is described, section headers and the
/// status line.

use std::collections::HashSet;

use crate::state::data::{Book, BookId, SpaceState};
use crate::state::edit::{DisplayEdit, IndexPath};
use crate::state::sync::SynchronizedView;

/// Rows the user expanded to show the long description
#[derive(Debug, Clone, Default)]
pub struct DetailExpansion {
    expanded: HashSet<BookId>,
}

impl DetailExpansion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Flip a book's expansion. Returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    /// Handle a tap on a row: flip its expansion and return the redraw edit
    pub fn select(&mut self, view: &SynchronizedView, at: IndexPath) -> Option<DisplayEdit> {
        let book = view.book_at(at)?;
        self.toggle(&book.id);
        Some(DisplayEdit::UpdateRow { at })
    }

    /// Forget books that left the view
    pub fn retain_visible(&mut self, view: &SynchronizedView) {
        self.expanded.retain(|id| view.contains(id));
    }
}

/// What the list shows for one book
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub id: BookId,
    pub title: String,
    pub subtitle: String,
    /// False when the archive has no pictures or the catalog does not say
    pub has_pictures: bool,
    pub favicon: Option<Vec<u8>>,
    pub space_state: SpaceState,
}

impl BookRow {
    pub fn new(book: &Book, expansion: &DetailExpansion, space_state: SpaceState) -> Self {
        let subtitle = if expansion.is_expanded(&book.id) {
            book.very_detailed_description()
        } else {
            book.detailed_description()
        };
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            subtitle,
            has_pictures: !book.is_no_pic.unwrap_or(true),
            favicon: book.favicon.clone(),
            space_state,
        }
    }
}

/// What tapping the download accessory does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryAction {
    Download,
    /// Ask before filling most of the remaining space
    ConfirmLowSpace,
    /// Tell the user the book does not fit
    InsufficientSpace,
}

impl From<SpaceState> for AccessoryAction {
    fn from(state: SpaceState) -> Self {
        match state {
            SpaceState::Enough => AccessoryAction::Download,
            SpaceState::Caution => AccessoryAction::ConfirmLowSpace,
            SpaceState::NotEnough => AccessoryAction::InsufficientSpace,
        }
    }
}

/// Section header text. A single section needs no header.
pub fn header_title(view: &SynchronizedView, section: usize) -> Option<&str> {
    if view.section_count() < 2 {
        return None;
    }
    view.sections()
        .get(section)
        .map(|s| s.name())
        .filter(|name| !name.is_empty())
}

/// Status line shown under the list
pub fn status_message(refreshing: bool, available: usize) -> String {
    if refreshing {
        return "Refreshing...".to_string();
    }
    match available {
        1 => "1 book available for download".to_string(),
        n => format!("{} books available for download", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::filter::OnlineFilter;
    use crate::state::sync::CatalogSynchronizer;

    fn view_of(books: Vec<Book>) -> SynchronizedView {
        let mut sync = CatalogSynchronizer::new(OnlineFilter::all_languages());
        sync.refresh(books).clone()
    }

    #[test]
    fn test_select_toggles_and_redraws_row() {
        let view = view_of(vec![Book::new("1", "en", "A")]);
        let mut expansion = DetailExpansion::new();
        let at = IndexPath::new(0, 0);

        assert_eq!(expansion.select(&view, at), Some(DisplayEdit::UpdateRow { at }));
        assert!(expansion.is_expanded("1"));
        expansion.select(&view, at);
        assert!(!expansion.is_expanded("1"));
        assert_eq!(expansion.select(&view, IndexPath::new(3, 0)), None);
    }

    #[test]
    fn test_retain_visible() {
        let mut expansion = DetailExpansion::new();
        expansion.toggle("1");
        expansion.toggle("gone");
        expansion.retain_visible(&view_of(vec![Book::new("1", "en", "A")]));
        assert!(expansion.is_expanded("1"));
        assert!(!expansion.is_expanded("gone"));
    }

    #[test]
    fn test_book_row_subtitle_follows_expansion() {
        let mut book = Book::new("1", "en", "A");
        book.article_count = Some(10);
        book.description = Some("Short".to_string());
        book.is_no_pic = Some(false);
        let mut expansion = DetailExpansion::new();

        let row = BookRow::new(&book, &expansion, SpaceState::Enough);
        assert_eq!(row.subtitle, "10 articles");
        assert!(row.has_pictures);

        expansion.toggle("1");
        let row = BookRow::new(&book, &expansion, SpaceState::Enough);
        assert_eq!(row.subtitle, "10 articles\nShort");
    }

    #[test]
    fn test_unknown_picture_flag_means_no_pictures() {
        let row = BookRow::new(&Book::new("1", "en", "A"), &DetailExpansion::new(), SpaceState::Caution);
        assert!(!row.has_pictures);
    }

    #[test]
    fn test_accessory_actions() {
        assert_eq!(AccessoryAction::from(SpaceState::Enough), AccessoryAction::Download);
        assert_eq!(AccessoryAction::from(SpaceState::Caution), AccessoryAction::ConfirmLowSpace);
        assert_eq!(
            AccessoryAction::from(SpaceState::NotEnough),
            AccessoryAction::InsufficientSpace
        );
    }

    #[test]
    fn test_headers_only_with_several_sections() {
        let single = view_of(vec![Book::new("1", "en", "A")]);
        assert_eq!(header_title(&single, 0), None);

        let several = view_of(vec![Book::new("1", "en", "A"), Book::new("2", "fr", "B")]);
        assert_eq!(header_title(&several, 1), Some("fr"));
        assert_eq!(header_title(&several, 5), None);
    }

    #[test]
    fn test_status_message() {
        assert_eq!(status_message(true, 4), "Refreshing...");
        assert_eq!(status_message(false, 1), "1 book available for download");
        assert_eq!(status_message(false, 0), "0 books available for download");
    }
}
