//! Offline content library: a SQLite-backed catalog of downloadable books
//! and a synchronizer that keeps a sorted, sectioned list of them in step
//! with catalog changes.

pub mod archives;
pub mod catalog;
pub mod config;
pub mod error;
pub mod presentation;
pub mod space;
pub mod state;

pub use error::{FilterError, LibraryError, Result, SyncError};
pub use state::data::{Book, BookId, SpaceState};
pub use state::edit::{DisplayEdit, IndexPath};
pub use state::filter::{BookFilter, OnlineFilter};
pub use state::library::Library;
pub use state::sync::{CatalogSynchronizer, Mutation, MutationKind, SynchronizedView};
