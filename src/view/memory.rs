//! In-memory graph view for testing and headless hosts.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{GraphView, ViewId};
use crate::types::{EdgeRecord, EntityRecord, GraphPatch, MaterializedNode};

#[derive(Debug, Default)]
struct ViewState {
    nodes: BTreeMap<String, MaterializedNode>,
    edges: BTreeMap<String, EdgeRecord>,
    notifications: Vec<(bool, bool)>,
    patches_applied: usize,
}

/// A graph view held entirely in memory.
#[derive(Debug)]
pub struct InMemoryGraphView {
    id: ViewId,
    state: RwLock<ViewState>,
}

impl Default for InMemoryGraphView {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self {
            id: ViewId::new(),
            state: RwLock::new(ViewState::default()),
        }
    }

    /// Insert a node directly, bypassing the engine.
    pub fn insert_node(&self, record: EntityRecord, expanded: bool) {
        self.state
            .write()
            .nodes
            .insert(record.token(), MaterializedNode { record, expanded });
    }

    /// Insert an edge directly, bypassing the engine.
    pub fn insert_edge(&self, edge: EdgeRecord) {
        self.state.write().edges.insert(edge.edge_id.clone(), edge);
    }

    /// All edges, ordered by id.
    pub fn edges(&self) -> Vec<EdgeRecord> {
        self.state.read().edges.values().cloned().collect()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }

    /// `(structure_changed, data_changed)` for every notification received.
    pub fn notifications(&self) -> Vec<(bool, bool)> {
        self.state.read().notifications.clone()
    }

    /// Number of patches applied.
    pub fn patches_applied(&self) -> usize {
        self.state.read().patches_applied
    }
}

impl GraphView for InMemoryGraphView {
    fn view_id(&self) -> ViewId {
        self.id
    }

    fn lookup(&self, token: &str) -> Option<MaterializedNode> {
        self.state.read().nodes.get(token).cloned()
    }

    fn edges_incident_to(&self, token: &str) -> Vec<EdgeRecord> {
        self.state
            .read()
            .edges
            .values()
            .filter(|e| e.is_incident_to(token))
            .cloned()
            .collect()
    }

    fn node_tokens(&self) -> Vec<String> {
        self.state.read().nodes.keys().cloned().collect()
    }

    fn apply(&self, patch: GraphPatch) {
        let mut state = self.state.write();
        state.patches_applied += 1;

        for edge_id in &patch.remove_edges {
            state.edges.remove(edge_id);
        }
        for token in &patch.remove_nodes {
            state.nodes.remove(token);
            state.edges.retain(|_, e| !e.is_incident_to(token));
        }
        for record in patch.add_nodes {
            state
                .nodes
                .insert(record.token(), MaterializedNode { record, expanded: false });
        }
        for record in patch.update_nodes {
            let token = record.token();
            match state.nodes.get_mut(&token) {
                Some(node) => node.record = record,
                None => {
                    state
                        .nodes
                        .insert(token, MaterializedNode { record, expanded: false });
                }
            }
        }
        for edge in patch.add_edges {
            let both_ends = state.nodes.contains_key(&edge.source.to_token())
                && state.nodes.contains_key(&edge.target.to_token());
            if both_ends {
                state.edges.insert(edge.edge_id.clone(), edge);
            }
        }
        for token in &patch.mark_expanded {
            if let Some(node) = state.nodes.get_mut(token) {
                node.expanded = true;
            }
        }
    }

    fn on_graph_changed(&self, structure_changed: bool, data_changed: bool) {
        self.state
            .write()
            .notifications
            .push((structure_changed, data_changed));
    }
}
