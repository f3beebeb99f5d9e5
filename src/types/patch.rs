//! Mutation instructions emitted to graph views.

use serde::{Deserialize, Serialize};

use super::edge::EdgeRecord;
use super::entity::EntityRecord;
use super::identifier::EntityId;

/// A minimal set of changes for a graph view to apply.
///
/// Views apply the parts in field order: edge removals, node removals
/// (which also drop incident edges), node additions and updates, edge
/// additions, and finally expansion marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPatch {
    /// Ids of edges to remove.
    pub remove_edges: Vec<String>,
    /// Tokens of nodes to remove.
    pub remove_nodes: Vec<String>,
    /// Nodes not yet materialized.
    pub add_nodes: Vec<EntityRecord>,
    /// Materialized nodes whose data changed (e.g. a promoted placeholder).
    pub update_nodes: Vec<EntityRecord>,
    /// Edges to add.
    pub add_edges: Vec<EdgeRecord>,
    /// Tokens of nodes whose neighborhood is now loaded.
    pub mark_expanded: Vec<String>,
}

impl GraphPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any node or edge is added or removed.
    pub fn structure_changed(&self) -> bool {
        !(self.remove_edges.is_empty()
            && self.remove_nodes.is_empty()
            && self.add_nodes.is_empty()
            && self.add_edges.is_empty())
    }

    /// Whether any node's data is replaced.
    pub fn data_changed(&self) -> bool {
        !self.update_nodes.is_empty()
    }

    /// Whether applying the patch would change the view at all.
    pub fn is_empty(&self) -> bool {
        !self.structure_changed() && !self.data_changed() && self.mark_expanded.is_empty()
    }
}

/// What a refresh did for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshAction {
    /// The node was removed (deleted, or no longer backed by a document).
    Removed,
    /// The node's full neighborhood was recomputed.
    Expanded,
    /// A bare node was materialized or refreshed without its neighborhood.
    Bare,
    /// The node was removed under `from` and refreshed under its new id.
    Renamed {
        /// Token the node was materialized under before the rename.
        from: String,
    },
    /// Nothing to do (e.g. deleting a node the view never held).
    NoOp,
}

/// Summary of one refresh on one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Entity the refresh was about.
    pub entity: EntityId,
    /// What was done.
    pub action: RefreshAction,
    /// Nodes added.
    pub nodes_added: usize,
    /// Nodes removed.
    pub nodes_removed: usize,
    /// Nodes whose data was replaced.
    pub nodes_updated: usize,
    /// Edges added.
    pub edges_added: usize,
    /// Edges removed.
    pub edges_removed: usize,
}

impl RefreshReport {
    /// Build a report from the patch that was applied.
    pub fn from_patch(entity: EntityId, action: RefreshAction, patch: &GraphPatch) -> Self {
        Self {
            entity,
            action,
            nodes_added: patch.add_nodes.len(),
            nodes_removed: patch.remove_nodes.len(),
            nodes_updated: patch.update_nodes.len(),
            edges_added: patch.add_edges.len(),
            edges_removed: patch.remove_edges.len(),
        }
    }

    /// Report for a refresh that changed nothing.
    pub fn noop(entity: EntityId) -> Self {
        Self::from_patch(entity, RefreshAction::NoOp, &GraphPatch::new())
    }

    /// Whether the refresh added or removed anything.
    pub fn changed_structure(&self) -> bool {
        self.nodes_added + self.nodes_removed + self.edges_added + self.edges_removed > 0
    }
}
