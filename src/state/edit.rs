/// Display edits
///
/// A list renderer keeps its own copy of the sectioned list. After each
/// reconciliation it receives a sequence of `DisplayEdit`s which, applied one
/// after another in the order given, turn the previously displayed list into
/// the current synchronized view. Every index refers to the list as it is at
/// the moment that edit is applied.

use std::fmt;

use serde::Serialize;

/// Flat (section, row) coordinate into a sectioned list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

/// One structural change to a displayed sectioned list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum DisplayEdit {
    /// Insert an empty section at this index
    InsertSection { section: usize },
    /// Remove a section together with all of its rows
    DeleteSection { section: usize },
    InsertRow { at: IndexPath },
    DeleteRow { at: IndexPath },
    /// Redraw a row in place; never changes the list shape
    UpdateRow { at: IndexPath },
}

impl DisplayEdit {
    /// True for edits that change the number of sections or rows
    pub fn is_structural(&self) -> bool {
        !matches!(self, DisplayEdit::UpdateRow { .. })
    }
}

impl fmt::Display for DisplayEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayEdit::InsertSection { section } => write!(f, "insert section {}", section),
            DisplayEdit::DeleteSection { section } => write!(f, "delete section {}", section),
            DisplayEdit::InsertRow { at } => write!(f, "insert row {}", at),
            DisplayEdit::DeleteRow { at } => write!(f, "delete row {}", at),
            DisplayEdit::UpdateRow { at } => write!(f, "update row {}", at),
        }
    }
}
