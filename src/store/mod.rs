//! Collaborator interfaces for the external document store and its
//! reference index.
//!
//! Both are read-only from the engine's side and queried on demand; the
//! engine keeps no copy of their data between refreshes.

pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::types::RawReference;

/// Metadata the store reports for a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMeta {
    /// Kind/tag classes.
    pub tags: BTreeSet<String>,
    /// Frontmatter-style properties.
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// The primary document store.
///
/// Documents are addressed by their canonical path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Read a document's content; `None` if no document exists at `path`.
    async fn read(&self, path: &str) -> Result<Option<String>, Self::Error>;

    /// Resolve link text written in `origin_path` to a document path.
    fn resolve(&self, link: &str, origin_path: &str) -> Option<String>;

    /// Tags and properties of a document.
    async fn metadata(&self, _path: &str) -> Result<DocumentMeta, Self::Error> {
        Ok(DocumentMeta::default())
    }
}

/// The store's reference index.
#[async_trait]
pub trait ReferenceIndex: Send + Sync {
    /// Error type for index operations.
    type Error: std::error::Error + Send + Sync;

    /// Outgoing references of a document, in document order.
    async fn references(&self, path: &str) -> Result<Vec<RawReference>, Self::Error>;

    /// Resolved forward links of the whole corpus: source path to target
    /// paths. Used for back-reference scans.
    async fn forward_links(&self) -> Result<BTreeMap<String, BTreeSet<String>>, Self::Error>;

    /// Whether the index reflects the current state of `path`.
    ///
    /// Polled after a rename before the new path is refreshed.
    async fn is_current(&self, _path: &str) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub use memory::{InMemoryError, InMemoryVault};
