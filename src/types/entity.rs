//! Entity (node) records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::identifier::EntityId;

/// A node of the derived graph.
///
/// A dangling record is a placeholder for a reference target that does not
/// resolve to a document yet. It has no path, no content and no tags; it is
/// replaced by a full record under the same token once the document appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Backing document path, `None` for dangling or foreign entities.
    pub path: Option<String>,
    /// Kind/tag classes.
    pub tags: BTreeSet<String>,
    /// Metadata properties (frontmatter and the like).
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Raw document content.
    pub content: String,
    /// Whether this is an unresolved placeholder.
    pub dangling: bool,
}

impl EntityRecord {
    /// Create a record backed by a document.
    pub fn document(id: EntityId, path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            path: Some(path.into()),
            tags: BTreeSet::new(),
            properties: BTreeMap::new(),
            content: content.into(),
            dangling: false,
        }
    }

    /// Create a dangling placeholder record.
    pub fn dangling(id: EntityId) -> Self {
        Self {
            id,
            path: None,
            tags: BTreeSet::new(),
            properties: BTreeMap::new(),
            content: String::new(),
            dangling: true,
        }
    }

    /// Attach tags.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Attach metadata properties.
    pub fn with_properties(mut self, properties: BTreeMap<String, serde_json::Value>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Token of this record's identifier.
    pub fn token(&self) -> String {
        self.id.to_token()
    }

    /// Whether this record is an unresolved placeholder.
    pub fn is_dangling(&self) -> bool {
        self.dangling
    }
}

/// A node as held by a graph view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedNode {
    /// The node's data.
    pub record: EntityRecord,
    /// Whether the node's neighborhood has been loaded.
    pub expanded: bool,
}
