/// State management module
///
/// This module handles all catalog state, including:
/// - Database connections and queries (library.rs)
/// - Shared data structures (data.rs)
/// - Book filters (filter.rs)
/// - Display edits for list renderers (edit.rs)
/// - The synchronized, sectioned view of the catalog (sync.rs)

pub mod data;
pub mod edit;
pub mod filter;
pub mod library;
pub mod sync;
