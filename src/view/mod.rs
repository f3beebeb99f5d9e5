//! Graph view contract.
//!
//! A view is owned by the visualization layer and holds the materialized
//! graph. The engine only reads it and hands it [`GraphPatch`]es; it never
//! keeps a copy of its own.

pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{EdgeRecord, GraphPatch, MaterializedNode};

/// Handle naming one active graph view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewId(Uuid);

impl ViewId {
    /// Generate a fresh view id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ViewId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A materialized graph held by the visualization layer.
///
/// Implementations use interior mutability; all methods take `&self`.
pub trait GraphView: Send + Sync {
    /// Stable id of this view.
    fn view_id(&self) -> ViewId;

    /// Look up a node by token.
    fn lookup(&self, token: &str) -> Option<MaterializedNode>;

    /// Edges with the given node as source or target.
    fn edges_incident_to(&self, token: &str) -> Vec<EdgeRecord>;

    /// Tokens of all materialized nodes.
    fn node_tokens(&self) -> Vec<String>;

    /// Apply a patch. Removing a node must also remove its incident edges.
    fn apply(&self, patch: GraphPatch);

    /// Notification that the graph changed.
    fn on_graph_changed(&self, structure_changed: bool, data_changed: bool);
}

pub use memory::InMemoryGraphView;
