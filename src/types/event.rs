//! External change notifications.

use serde::{Deserialize, Serialize};

use super::identifier::EntityId;

/// A mutation reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A document's content (or metadata) changed, or it was created.
    ContentChanged {
        /// Document path.
        path: String,
    },
    /// A document moved from `old_path` to `path`.
    Renamed {
        /// New path.
        path: String,
        /// Path before the rename.
        old_path: String,
    },
    /// A document was deleted.
    Deleted {
        /// Path of the deleted document.
        path: String,
    },
}

impl ChangeEvent {
    /// Content-changed event.
    pub fn content_changed(path: impl Into<String>) -> Self {
        Self::ContentChanged { path: path.into() }
    }

    /// Rename event.
    pub fn renamed(path: impl Into<String>, old_path: impl Into<String>) -> Self {
        Self::Renamed {
            path: path.into(),
            old_path: old_path.into(),
        }
    }

    /// Deletion event.
    pub fn deleted(path: impl Into<String>) -> Self {
        Self::Deleted { path: path.into() }
    }

    /// Current path of the affected document.
    pub fn path(&self) -> &str {
        match self {
            Self::ContentChanged { path } | Self::Renamed { path, .. } | Self::Deleted { path } => path,
        }
    }

    /// Entity the event is about.
    pub fn entity(&self) -> EntityId {
        EntityId::from_path(self.path())
    }
}
