//! In-memory document store and reference index for testing.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocumentMeta, DocumentStore, ReferenceIndex};
use crate::types::{EntityId, RawReference, Span};

/// Error type for the in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// A read was configured to fail.
    #[error("Read failed: {0}")]
    ReadFailed(String),
}

#[derive(Debug, Clone, Default)]
struct Document {
    content: String,
    meta: DocumentMeta,
}

#[derive(Debug, Default)]
struct VaultState {
    docs: BTreeMap<String, Document>,
    /// Paths whose index entries have not caught up yet.
    stale: BTreeSet<String>,
    /// Paths whose reads fail.
    failing: BTreeSet<String>,
}

/// In-memory vault of linked documents.
///
/// Implements both [`DocumentStore`] and [`ReferenceIndex`]; references are
/// scanned from `[[...]]` link syntax on demand. Uses BTreeMap/BTreeSet for
/// deterministic iteration order and a lock so tests can mutate it while
/// refreshes are in flight.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    state: RwLock<VaultState>,
}

impl InMemoryVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn put(&self, path: impl Into<String>, content: impl Into<String>) {
        let mut state = self.state.write();
        let doc = state.docs.entry(path.into()).or_default();
        doc.content = content.into();
    }

    /// Set a document's tags.
    pub fn set_tags<I, T>(&self, path: &str, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        if let Some(doc) = self.state.write().docs.get_mut(path) {
            doc.meta.tags = tags.into_iter().map(Into::into).collect();
        }
    }

    /// Set one metadata property of a document.
    pub fn set_property(&self, path: &str, key: impl Into<String>, value: serde_json::Value) {
        if let Some(doc) = self.state.write().docs.get_mut(path) {
            doc.meta.properties.insert(key.into(), value);
        }
    }

    /// Remove a document.
    pub fn delete(&self, path: &str) -> bool {
        self.state.write().docs.remove(path).is_some()
    }

    /// Move a document to a new path. The index is current immediately.
    pub fn rename(&self, old_path: &str, new_path: impl Into<String>) -> bool {
        let mut state = self.state.write();
        match state.docs.remove(old_path) {
            Some(doc) => {
                state.docs.insert(new_path.into(), doc);
                true
            }
            None => false,
        }
    }

    /// Move a document, leaving the index behind until
    /// [`InMemoryVault::mark_current`] is called for `new_path`.
    pub fn rename_lagging(&self, old_path: &str, new_path: impl Into<String>) -> bool {
        let new_path = new_path.into();
        let moved = self.rename(old_path, new_path.clone());
        if moved {
            self.state.write().stale.insert(new_path);
        }
        moved
    }

    /// Let the index catch up with `path`.
    pub fn mark_current(&self, path: &str) {
        self.state.write().stale.remove(path);
    }

    /// Make reads of `path` fail (or succeed again).
    pub fn set_read_failure(&self, path: &str, failing: bool) {
        let mut state = self.state.write();
        if failing {
            state.failing.insert(path.to_string());
        } else {
            state.failing.remove(path);
        }
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    /// Whether the vault holds no documents.
    pub fn is_empty(&self) -> bool {
        self.state.read().docs.is_empty()
    }

    fn resolve_in(state: &VaultState, link: &str) -> Option<String> {
        let target = link.split('|').next().unwrap_or("");
        let target = target.split('#').next().unwrap_or("").trim();
        if target.is_empty() {
            return None;
        }
        if state.docs.contains_key(target) {
            return Some(target.to_string());
        }
        let with_ext = format!("{target}.md");
        if state.docs.contains_key(&with_ext) {
            return Some(with_ext);
        }
        let wanted = EntityId::from_link(target);
        state
            .docs
            .keys()
            .find(|path| EntityId::from_path(path) == wanted)
            .cloned()
    }
}

/// Scan `[[...]]` links line by line.
pub fn scan_links(content: &str) -> Vec<RawReference> {
    let mut refs = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let mut offset = 0;
        while let Some(open) = line[offset..].find("[[") {
            let start = offset + open;
            let Some(close) = line[start + 2..].find("]]") else {
                break;
            };
            let text = &line[start + 2..start + 2 + close];
            let end = start + 2 + close + 2;
            if !text.is_empty() && !text.contains('[') {
                refs.push(RawReference::new(text, Span::new(line_no, start, end)));
            }
            offset = end;
        }
    }
    refs
}

#[async_trait]
impl DocumentStore for InMemoryVault {
    type Error = InMemoryError;

    async fn read(&self, path: &str) -> Result<Option<String>, Self::Error> {
        let state = self.state.read();
        if state.failing.contains(path) {
            return Err(InMemoryError::ReadFailed(path.to_string()));
        }
        Ok(state.docs.get(path).map(|d| d.content.clone()))
    }

    fn resolve(&self, link: &str, _origin_path: &str) -> Option<String> {
        Self::resolve_in(&self.state.read(), link)
    }

    async fn metadata(&self, path: &str) -> Result<DocumentMeta, Self::Error> {
        Ok(self
            .state
            .read()
            .docs
            .get(path)
            .map(|d| d.meta.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReferenceIndex for InMemoryVault {
    type Error = InMemoryError;

    async fn references(&self, path: &str) -> Result<Vec<RawReference>, Self::Error> {
        let state = self.state.read();
        if state.stale.contains(path) {
            return Ok(Vec::new());
        }
        Ok(state
            .docs
            .get(path)
            .map(|d| scan_links(&d.content))
            .unwrap_or_default())
    }

    async fn forward_links(&self) -> Result<BTreeMap<String, BTreeSet<String>>, Self::Error> {
        let state = self.state.read();
        let mut links = BTreeMap::new();
        for (path, doc) in state.docs.iter().filter(|(p, _)| !state.stale.contains(*p)) {
            let targets: BTreeSet<String> = scan_links(&doc.content)
                .iter()
                .filter_map(|r| Self::resolve_in(&state, &r.link_text))
                .collect();
            if !targets.is_empty() {
                links.insert(path.clone(), targets);
            }
        }
        Ok(links)
    }

    async fn is_current(&self, path: &str) -> Result<bool, Self::Error> {
        Ok(!self.state.read().stale.contains(path))
    }
}
