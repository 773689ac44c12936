/// Catalog synchronization
///
/// `CatalogSynchronizer` keeps a sorted, grouped and filtered view over the
/// books of the catalog store, and turns batches of store mutations into the
/// display edits a list renderer needs to follow along.
///
/// The synchronizer is single-threaded: mutations produced elsewhere (for
/// example by a background archive scan) travel through the mutation channel
/// and are reconciled on the thread that owns the synchronizer.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::data::{Book, BookId};
use super::edit::{DisplayEdit, IndexPath};
use super::filter::BookFilter;
use crate::error::{FilterError, SyncError};

/// Kind of change the store committed for a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MutationKind {
    Insert,
    Delete,
    Update,
    /// Update that changed the book's sort key
    Move,
}

/// One committed store change, carrying the book as it is after the change
/// (or as it was, for deletions)
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub book: Book,
}

impl Mutation {
    pub fn insert(book: Book) -> Self {
        Self { kind: MutationKind::Insert, book }
    }

    pub fn delete(book: Book) -> Self {
        Self { kind: MutationKind::Delete, book }
    }

    pub fn update(book: Book) -> Self {
        Self { kind: MutationKind::Update, book }
    }

    pub fn moved(book: Book) -> Self {
        Self { kind: MutationKind::Move, book }
    }
}

pub type MutationSender = UnboundedSender<Mutation>;
pub type MutationReceiver = UnboundedReceiver<Mutation>;

/// Channel carrying store mutations to the synchronizer, in commit order
pub fn mutation_channel() -> (MutationSender, MutationReceiver) {
    mpsc::unbounded_channel()
}

/// Take every mutation currently queued without waiting for more
pub fn drain_mutations(receiver: &mut MutationReceiver) -> Vec<Mutation> {
    let mut mutations = Vec::new();
    while let Ok(mutation) = receiver.try_recv() {
        mutations.push(mutation);
    }
    mutations
}

/// A group of books sharing a language name
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    books: Vec<Book>,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Short fast-scroll label: the capitalized first letter of the name
    pub fn index_title(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

/// Sorted, grouped snapshot of the books that pass the current filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynchronizedView {
    sections: Vec<Section>,
    positions: HashMap<BookId, IndexPath>,
}

impl SynchronizedView {
    /// Group books that are already filtered and sorted in canonical order
    fn from_sorted(books: Vec<Book>) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        for book in books {
            let name = book.section_name().unwrap_or_default().to_string();
            match sections.last_mut() {
                Some(section) if section.name == name => section.books.push(book),
                _ => sections.push(Section { name, books: vec![book] }),
            }
        }
        let mut view = Self { sections, positions: HashMap::new() };
        view.reindex();
        view
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, Section::len)
    }

    /// Total number of rows across all sections
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|section| section.name.as_str())
    }

    /// All books in display order
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.sections.iter().flat_map(|section| section.books.iter())
    }

    pub fn book_at(&self, at: IndexPath) -> Option<&Book> {
        self.sections.get(at.section)?.books.get(at.row)
    }

    pub fn index_of(&self, id: &str) -> Option<IndexPath> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Place a book at its sorted position, creating its section if needed.
    /// Positions are stale until `reindex` runs.
    fn insert(&mut self, book: Book) {
        let name = book.section_name().unwrap_or_default();
        let section = match self.sections.binary_search_by(|s| s.name.as_str().cmp(name)) {
            Ok(index) => index,
            Err(index) => {
                self.sections.insert(
                    index,
                    Section { name: name.to_string(), books: Vec::new() },
                );
                index
            }
        };
        let books = &mut self.sections[section].books;
        let row = books
            .binary_search_by(|b| b.sort_key().cmp(&book.sort_key()))
            .unwrap_or_else(|row| row);
        books.insert(row, book);
    }

    /// Remove the book stored under `book`'s sort key, dropping its section
    /// once empty. Returns false if the book was not displayed.
    fn remove(&mut self, book: &Book) -> bool {
        let Some(name) = book.section_name() else {
            return false;
        };
        let Ok(section) = self.sections.binary_search_by(|s| s.name.as_str().cmp(name)) else {
            return false;
        };
        let books = &mut self.sections[section].books;
        let Ok(row) = books.binary_search_by(|b| b.sort_key().cmp(&book.sort_key())) else {
            return false;
        };
        books.remove(row);
        if books.is_empty() {
            self.sections.remove(section);
        }
        true
    }

    fn reindex(&mut self) {
        self.positions.clear();
        for (section_index, section) in self.sections.iter().enumerate() {
            for (row, book) in section.books.iter().enumerate() {
                self.positions
                    .insert(book.id.clone(), IndexPath::new(section_index, row));
            }
        }
    }
}

/// Keeps a `SynchronizedView` consistent with the catalog store
pub struct CatalogSynchronizer {
    filter: Box<dyn BookFilter>,
    /// Every book the store reported, including those the filter rejects
    known: HashMap<BookId, Book>,
    view: SynchronizedView,
    warnings: Vec<FilterError>,
}

impl CatalogSynchronizer {
    /// Create a synchronizer with an empty view
    pub fn new(filter: impl BookFilter + 'static) -> Self {
        Self {
            filter: Box::new(filter),
            known: HashMap::new(),
            view: SynchronizedView::default(),
            warnings: Vec::new(),
        }
    }

    pub fn view(&self) -> &SynchronizedView {
        &self.view
    }

    /// Replace the filter and rebuild the view from a full store query
    pub fn rebuild<I>(&mut self, filter: impl BookFilter + 'static, entries: I) -> &SynchronizedView
    where
        I: IntoIterator<Item = Book>,
    {
        self.filter = Box::new(filter);
        self.refresh(entries)
    }

    /// Rebuild the view from a full store query, keeping the current filter
    pub fn refresh<I>(&mut self, entries: I) -> &SynchronizedView
    where
        I: IntoIterator<Item = Book>,
    {
        self.warnings.clear();
        self.known.clear();

        let mut included = Vec::new();
        for book in entries {
            if self.admit(&book) {
                included.push(book.clone());
            }
            self.known.insert(book.id.clone(), book);
        }
        included.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        self.view = SynchronizedView::from_sorted(included);
        info!(
            "Rebuilt catalog view: {} books in {} sections ({} known)",
            self.view.len(),
            self.view.section_count(),
            self.known.len()
        );
        &self.view
    }

    /// Apply a batch of store mutations and return the display edits that turn
    /// the previously displayed list into the new view.
    ///
    /// Edits are ordered for sequential application: row deletions (highest
    /// index first), section deletions, section insertions, row insertions
    /// (lowest index first), then row updates at their final positions.
    /// A batch that references an unknown book is rejected as a whole and
    /// leaves the view untouched.
    pub fn reconcile(&mut self, mutations: &[Mutation]) -> Result<Vec<DisplayEdit>, SyncError> {
        if mutations.is_empty() {
            return Ok(Vec::new());
        }
        self.validate(mutations)?;

        let old_sections: Vec<String> = self.view.section_names().map(str::to_owned).collect();
        let mut touched: Vec<BookId> = Vec::new();
        let mut before: HashMap<BookId, (IndexPath, Book)> = HashMap::new();
        let mut seen = HashSet::new();
        for mutation in mutations {
            let id = &mutation.book.id;
            if !seen.insert(id.clone()) {
                continue;
            }
            touched.push(id.clone());
            if let Some(at) = self.view.index_of(id) {
                if let Some(book) = self.view.book_at(at) {
                    before.insert(id.clone(), (at, book.clone()));
                }
            }
        }

        for mutation in mutations {
            self.apply(mutation);
        }
        self.view.reindex();

        let new_names: HashSet<&str> = self.view.section_names().collect();
        let old_names: HashSet<&str> = old_sections.iter().map(String::as_str).collect();

        let deleted_sections: Vec<usize> = old_sections
            .iter()
            .enumerate()
            .filter(|(_, name)| !new_names.contains(name.as_str()))
            .map(|(index, _)| index)
            .collect();
        let inserted_sections: Vec<usize> = self
            .view
            .section_names()
            .enumerate()
            .filter(|(_, name)| !old_names.contains(name))
            .map(|(index, _)| index)
            .collect();
        let dropped: HashSet<usize> = deleted_sections.iter().copied().collect();

        let mut row_deletes = Vec::new();
        let mut row_inserts = Vec::new();
        let mut row_updates = Vec::new();
        for id in &touched {
            let old = before.get(id);
            let new = self.view.index_of(id);
            match (old, new) {
                (None, None) => {}
                (None, Some(at)) => row_inserts.push(at),
                (Some((at, _)), None) => {
                    if !dropped.contains(&at.section) {
                        row_deletes.push(*at);
                    }
                }
                (Some((old_at, old_book)), Some(new_at)) => {
                    let unchanged = self
                        .view
                        .book_at(new_at)
                        .is_some_and(|book| book.same_position_key(old_book));
                    if unchanged {
                        row_updates.push(new_at);
                    } else {
                        if !dropped.contains(&old_at.section) {
                            row_deletes.push(*old_at);
                        }
                        row_inserts.push(new_at);
                    }
                }
            }
        }

        row_deletes.sort_unstable_by(|a, b| b.cmp(a));
        row_inserts.sort_unstable();
        row_updates.sort_unstable();

        let mut edits = Vec::with_capacity(
            row_deletes.len()
                + deleted_sections.len()
                + inserted_sections.len()
                + row_inserts.len()
                + row_updates.len(),
        );
        edits.extend(row_deletes.into_iter().map(|at| DisplayEdit::DeleteRow { at }));
        edits.extend(
            deleted_sections
                .into_iter()
                .rev()
                .map(|section| DisplayEdit::DeleteSection { section }),
        );
        edits.extend(
            inserted_sections
                .into_iter()
                .map(|section| DisplayEdit::InsertSection { section }),
        );
        edits.extend(row_inserts.into_iter().map(|at| DisplayEdit::InsertRow { at }));
        edits.extend(row_updates.into_iter().map(|at| DisplayEdit::UpdateRow { at }));

        debug!(
            "Reconciled {} mutations into {} display edits",
            mutations.len(),
            edits.len()
        );
        Ok(edits)
    }

    /// Fast-scroll labels, one per section. Empty for fewer than three sections.
    pub fn section_index_titles(&self) -> Vec<String> {
        if self.view.section_count() < 3 {
            return Vec::new();
        }
        self.view.sections.iter().map(Section::index_title).collect()
    }

    /// Resolve a fast-scroll label (or a full section name) to a section index.
    ///
    /// Without an exact match, picks the first section whose label sorts at or
    /// after `title`, or the last section. None only for an empty view.
    pub fn locate(&self, title: &str) -> Option<usize> {
        let sections = self.view.sections();
        if sections.is_empty() {
            return None;
        }
        if let Some(index) = sections
            .iter()
            .position(|s| s.index_title() == title || s.name() == title)
        {
            return Some(index);
        }
        let closest = sections
            .iter()
            .position(|s| s.index_title().as_str() >= title)
            .unwrap_or(sections.len() - 1);
        Some(closest)
    }

    /// Filter warnings collected since the last rebuild
    pub fn warnings(&self) -> &[FilterError] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<FilterError> {
        std::mem::take(&mut self.warnings)
    }

    /// Dry run over the batch: every Delete/Update/Move must name a book that
    /// exists at that point of the sequence.
    fn validate(&self, mutations: &[Mutation]) -> Result<(), SyncError> {
        let mut added: HashSet<&str> = HashSet::new();
        let mut removed: HashSet<&str> = HashSet::new();
        for mutation in mutations {
            let id = mutation.book.id.as_str();
            let present =
                added.contains(id) || (self.known.contains_key(id) && !removed.contains(id));
            match mutation.kind {
                MutationKind::Insert => {
                    removed.remove(id);
                    added.insert(id);
                }
                kind => {
                    if !present {
                        warn!("Rejecting mutation batch: {:?} of unknown book {}", kind, id);
                        return Err(SyncError::StaleReference { id: id.to_string(), kind });
                    }
                    if kind == MutationKind::Delete {
                        added.remove(id);
                        removed.insert(id);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, mutation: &Mutation) {
        let id = &mutation.book.id;
        if let Some(previous) = self.known.remove(id) {
            self.view.remove(&previous);
        }
        if mutation.kind == MutationKind::Delete {
            return;
        }
        let book = mutation.book.clone();
        if self.admit(&book) {
            self.view.insert(book.clone());
        }
        self.known.insert(id.clone(), book);
    }

    /// Evaluate the filter, recording failures as warnings
    fn admit(&mut self, book: &Book) -> bool {
        match self.filter.evaluate(book) {
            Ok(true) if book.section_name().is_some() => true,
            Ok(true) => {
                self.push_warning(FilterError::InconsistentFilter {
                    id: book.id.clone(),
                    reason: "cannot group a book without a language name".to_string(),
                });
                false
            }
            Ok(false) => false,
            Err(error) => {
                self.push_warning(error);
                false
            }
        }
    }

    fn push_warning(&mut self, error: FilterError) {
        warn!("Excluding book from view: {}", error);
        self.warnings.push(error);
    }
}

impl std::fmt::Debug for CatalogSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSynchronizer")
            .field("known", &self.known.len())
            .field("rows", &self.view.len())
            .field("sections", &self.view.section_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::filter::OnlineFilter;

    fn ids(view: &SynchronizedView) -> Vec<Vec<BookId>> {
        view.sections()
            .iter()
            .map(|s| s.books().iter().map(|b| b.id.clone()).collect())
            .collect()
    }

    /// Apply edits one by one to a plain list, panicking on any invalid index
    fn replay(
        mut rows: Vec<Vec<BookId>>,
        edits: &[DisplayEdit],
        current: &SynchronizedView,
    ) -> Vec<Vec<BookId>> {
        for edit in edits {
            match *edit {
                DisplayEdit::InsertSection { section } => rows.insert(section, Vec::new()),
                DisplayEdit::DeleteSection { section } => {
                    rows.remove(section);
                }
                DisplayEdit::InsertRow { at } => {
                    let id = current.book_at(at).unwrap().id.clone();
                    rows[at.section].insert(at.row, id);
                }
                DisplayEdit::DeleteRow { at } => {
                    rows[at.section].remove(at.row);
                }
                DisplayEdit::UpdateRow { at } => {
                    assert!(at.row < rows[at.section].len());
                }
            }
        }
        rows
    }

    fn sample_store() -> Vec<Book> {
        vec![Book::new("1", "en", "B"), Book::new("2", "en", "A")]
    }

    fn synced(store: Vec<Book>) -> CatalogSynchronizer {
        let mut sync = CatalogSynchronizer::new(OnlineFilter::all_languages());
        sync.refresh(store);
        sync
    }

    #[test]
    fn test_rebuild_groups_and_sorts() {
        let sync = synced(sample_store());
        let view = sync.view();
        assert_eq!(view.section_count(), 1);
        assert_eq!(view.sections()[0].name(), "en");
        assert_eq!(ids(view), vec![vec!["2".to_string(), "1".to_string()]]);
        assert_eq!(view.index_of("1"), Some(IndexPath::new(0, 1)));
    }

    #[test]
    fn test_rebuild_empty_store() {
        let sync = synced(Vec::new());
        assert!(sync.view().is_empty());
        assert_eq!(sync.view().section_count(), 0);
        assert_eq!(sync.locate("A"), None);
    }

    #[test]
    fn test_rebuild_is_deterministic_with_ties() {
        let store = vec![
            Book::new("b", "en", "Same"),
            Book::new("a", "en", "Same"),
            Book::new("c", "de", "Other"),
        ];
        let mut reversed = store.clone();
        reversed.reverse();

        let first = synced(store);
        let second = synced(reversed);
        assert_eq!(first.view(), second.view());
        assert_eq!(
            ids(first.view()),
            vec![vec!["c".to_string()], vec!["a".to_string(), "b".to_string()]]
        );
    }

    #[test]
    fn test_rebuild_applies_language_preference() {
        let mut sync = synced(vec![
            Book::new("1", "en", "A"),
            Book::new("2", "fr", "B"),
        ]);
        let store: Vec<Book> = sync.view().books().cloned().collect();
        sync.rebuild(OnlineFilter::new(["fr"]), store);
        assert_eq!(ids(sync.view()), vec![vec!["2".to_string()]]);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let mut sync = synced(sample_store());
        let before = sync.view().clone();
        assert_eq!(sync.reconcile(&[]), Ok(Vec::new()));
        assert_eq!(sync.view(), &before);
    }

    #[test]
    fn test_insert_into_new_section() {
        let mut sync = synced(sample_store());
        let edits = sync
            .reconcile(&[Mutation::insert(Book::new("3", "fr", "C"))])
            .unwrap();
        assert_eq!(
            edits,
            vec![
                DisplayEdit::InsertSection { section: 1 },
                DisplayEdit::InsertRow { at: IndexPath::new(1, 0) },
            ]
        );
    }

    #[test]
    fn test_insert_into_existing_section() {
        let mut sync = synced(sample_store());
        let edits = sync
            .reconcile(&[Mutation::insert(Book::new("3", "en", "AB"))])
            .unwrap();
        assert_eq!(edits, vec![DisplayEdit::InsertRow { at: IndexPath::new(0, 1) }]);
    }

    #[test]
    fn test_delete_keeps_non_empty_section() {
        let mut sync = synced(sample_store());
        let edits = sync
            .reconcile(&[Mutation::delete(Book::new("2", "en", "A"))])
            .unwrap();
        assert_eq!(edits, vec![DisplayEdit::DeleteRow { at: IndexPath::new(0, 0) }]);
        assert_eq!(ids(sync.view()), vec![vec!["1".to_string()]]);
    }

    #[test]
    fn test_deleting_last_row_deletes_section_only() {
        let mut sync = synced(vec![Book::new("1", "en", "B"), Book::new("3", "fr", "C")]);
        let edits = sync
            .reconcile(&[Mutation::delete(Book::new("1", "en", "B"))])
            .unwrap();
        assert_eq!(edits, vec![DisplayEdit::DeleteSection { section: 0 }]);
    }

    #[test]
    fn test_attribute_update_keeps_position() {
        let mut sync = synced(sample_store());
        let mut book = Book::new("1", "en", "B");
        book.file_size = 42;
        let edits = sync.reconcile(&[Mutation::update(book)]).unwrap();
        assert_eq!(edits, vec![DisplayEdit::UpdateRow { at: IndexPath::new(0, 1) }]);
        assert_eq!(sync.view().book_at(IndexPath::new(0, 1)).unwrap().file_size, 42);
    }

    #[test]
    fn test_title_change_is_a_move() {
        let mut sync = synced(sample_store());
        let edits = sync
            .reconcile(&[Mutation::moved(Book::new("1", "en", "0"))])
            .unwrap();
        assert_eq!(
            edits,
            vec![
                DisplayEdit::DeleteRow { at: IndexPath::new(0, 1) },
                DisplayEdit::InsertRow { at: IndexPath::new(0, 0) },
            ]
        );
    }

    #[test]
    fn test_language_change_reported_as_update_is_a_move() {
        let mut sync = synced(sample_store());
        let edits = sync
            .reconcile(&[Mutation::update(Book::new("1", "fr", "B"))])
            .unwrap();
        assert_eq!(
            edits,
            vec![
                DisplayEdit::DeleteRow { at: IndexPath::new(0, 1) },
                DisplayEdit::InsertSection { section: 1 },
                DisplayEdit::InsertRow { at: IndexPath::new(1, 0) },
            ]
        );
    }

    #[test]
    fn test_moving_last_book_out_of_section() {
        let mut sync = synced(vec![Book::new("1", "en", "B")]);
        let edits = sync
            .reconcile(&[Mutation::update(Book::new("1", "fr", "B"))])
            .unwrap();
        assert_eq!(
            edits,
            vec![
                DisplayEdit::DeleteSection { section: 0 },
                DisplayEdit::InsertSection { section: 0 },
                DisplayEdit::InsertRow { at: IndexPath::new(0, 0) },
            ]
        );
        assert_eq!(sync.view().sections()[0].name(), "fr");
    }

    #[test]
    fn test_becoming_local_removes_row() {
        let mut sync = synced(sample_store());
        let mut book = Book::new("2", "en", "A");
        book.is_local = true;
        let edits = sync.reconcile(&[Mutation::update(book)]).unwrap();
        assert_eq!(edits, vec![DisplayEdit::DeleteRow { at: IndexPath::new(0, 0) }]);
    }

    #[test]
    fn test_filtered_book_can_reappear() {
        let mut local = Book::new("3", "de", "Z");
        local.is_local = true;
        let mut store = sample_store();
        store.push(local);
        let mut sync = synced(store);
        assert!(!sync.view().contains("3"));

        let edits = sync
            .reconcile(&[Mutation::update(Book::new("3", "de", "Z"))])
            .unwrap();
        assert_eq!(
            edits,
            vec![
                DisplayEdit::InsertSection { section: 0 },
                DisplayEdit::InsertRow { at: IndexPath::new(0, 0) },
            ]
        );
    }

    #[test]
    fn test_stale_reference_rejects_whole_batch() {
        let mut sync = synced(sample_store());
        let before = sync.view().clone();
        let result = sync.reconcile(&[
            Mutation::insert(Book::new("3", "fr", "C")),
            Mutation::update(Book::new("99", "en", "X")),
        ]);
        assert_eq!(
            result,
            Err(SyncError::StaleReference {
                id: "99".to_string(),
                kind: MutationKind::Update
            })
        );
        assert_eq!(sync.view(), &before);
    }

    #[test]
    fn test_update_after_delete_in_same_batch_is_stale() {
        let mut sync = synced(sample_store());
        let result = sync.reconcile(&[
            Mutation::delete(Book::new("1", "en", "B")),
            Mutation::update(Book::new("1", "en", "B")),
        ]);
        assert!(matches!(result, Err(SyncError::StaleReference { .. })));
    }

    #[test]
    fn test_insert_then_delete_in_same_batch_emits_nothing() {
        let mut sync = synced(sample_store());
        let book = Book::new("3", "fr", "C");
        let edits = sync
            .reconcile(&[Mutation::insert(book.clone()), Mutation::delete(book)])
            .unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_filter_errors_become_warnings() {
        let mut orphan = Book::new("9", "en", "Orphan");
        orphan.language = None;
        let mut store = sample_store();
        store.push(orphan.clone());

        let mut sync = synced(store);
        assert_eq!(sync.view().len(), 2);
        assert_eq!(sync.warnings().len(), 1);

        let edits = sync.reconcile(&[Mutation::update(orphan)]).unwrap();
        assert!(edits.is_empty());
        let warnings = sync.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(sync.warnings().is_empty());
    }

    #[test]
    fn test_section_index_titles() {
        let mut sync = synced(vec![Book::new("1", "english", "A"), Book::new("2", "french", "B")]);
        assert!(sync.section_index_titles().is_empty());

        sync.reconcile(&[Mutation::insert(Book::new("3", "german", "C"))])
            .unwrap();
        assert_eq!(sync.section_index_titles(), vec!["E", "F", "G"]);
    }

    #[test]
    fn test_locate_sections() {
        let sync = synced(vec![
            Book::new("1", "Deutsch", "A"),
            Book::new("2", "English", "B"),
            Book::new("3", "Français", "C"),
        ]);
        assert_eq!(sync.locate("E"), Some(1));
        assert_eq!(sync.locate("Français"), Some(2));
        assert_eq!(sync.locate("A"), Some(0));
        assert_eq!(sync.locate("Z"), Some(2));
    }

    #[test]
    fn test_edits_replay_to_rebuilt_view() {
        let mut store: HashMap<BookId, Book> = HashMap::new();
        let languages = ["de", "en", "fr", "ru"];
        let titles = ["Atlas", "Bible", "Chess", "Dune", "Edda"];
        let mut sync = CatalogSynchronizer::new(OnlineFilter::all_languages());
        sync.refresh(Vec::new());

        // small deterministic generator
        let mut seed: u64 = 7;
        let mut next = move |bound: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as usize) % bound
        };

        for _ in 0..60 {
            let displayed = ids(sync.view());
            let mut batch = Vec::new();
            for _ in 0..(1 + next(4)) {
                let id = format!("{}", next(12));
                let mut book = Book::new(
                    id.clone(),
                    languages[next(languages.len())],
                    titles[next(titles.len())],
                );
                book.is_local = next(5) == 0;
                let mutation = match (store.contains_key(&id), next(3)) {
                    (false, _) => Mutation::insert(book),
                    (true, 0) => Mutation::delete(book),
                    (true, _) => Mutation::update(book),
                };
                if mutation.kind == MutationKind::Delete {
                    store.remove(&id);
                } else {
                    store.insert(id, mutation.book.clone());
                }
                batch.push(mutation);
            }

            let edits = sync.reconcile(&batch).unwrap();
            let replayed = replay(displayed, &edits, sync.view());

            let fresh = synced(store.values().cloned().collect());
            assert_eq!(sync.view(), fresh.view());
            assert_eq!(replayed, ids(fresh.view()));
        }
    }

    #[test]
    fn test_drain_mutations_preserves_order() {
        let (sender, mut receiver) = mutation_channel();
        sender.send(Mutation::insert(Book::new("1", "en", "A"))).unwrap();
        sender.send(Mutation::delete(Book::new("1", "en", "A"))).unwrap();

        let drained = drain_mutations(&mut receiver);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, MutationKind::Insert);
        assert_eq!(drained[1].kind, MutationKind::Delete);
        assert!(drain_mutations(&mut receiver).is_empty());
    }
}
