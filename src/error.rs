//! Crate-level error type.

use crate::types::TokenParseError;
use crate::view::ViewId;

/// Errors surfaced by the engine and router.
///
/// Missing documents and lagging indexes are not errors: they degrade to
/// dangling nodes, removals or no-ops. Only collaborator I/O failures and
/// misconfiguration reach the caller, and they abort the one refresh in
/// progress.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Document store failure.
    #[error("Store error: {0}")]
    Store(String),
    /// Reference index failure.
    #[error("Index error: {0}")]
    Index(String),
    /// Configuration could not be used.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    /// A token could not be parsed.
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenParseError),
    /// A view worker had to be spawned outside a tokio runtime.
    #[error("No tokio runtime available")]
    NoRuntime,
    /// The view's worker has shut down.
    #[error("View closed: {0}")]
    ViewClosed(ViewId),
}

impl SyncError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }

    /// Create an index error from any error type.
    pub fn from_index<E: std::error::Error>(e: E) -> Self {
        Self::Index(e.to_string())
    }
}
