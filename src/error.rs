use thiserror::Error;

use crate::state::data::BookId;
use crate::state::sync::MutationKind;

/// Errors raised by the catalog database, feeds and background tasks
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("book not found: {0}")]
    BookNotFound(BookId),

    #[error("could not determine the user data directory")]
    NoDataDir,
}

/// Reconciliation failures. The batch is rejected and the caller must rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("{kind:?} mutation references book {id} which is not in the previous view")]
    StaleReference { id: BookId, kind: MutationKind },
}

/// A filter that could not decide on a book. The book is excluded and the
/// error is reported as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filter could not evaluate book {id}: {reason}")]
    InconsistentFilter { id: BookId, reason: String },
}

pub type Result<T, E = LibraryError> = std::result::Result<T, E>;
