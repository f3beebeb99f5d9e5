//! Incremental refresh engine.
//!
//! Reacts to a single changed, renamed or deleted document by recomputing
//! the edges incident to it, diffing them against what a view holds and
//! emitting the minimal [`GraphPatch`].
//!
//! ## Event handling
//!
//! | Event | Behaviour |
//! |-------|-----------|
//! | Content changed, document gone | Remove the node |
//! | Content changed, node expanded | Reload its neighborhood, rebuild its edges |
//! | Content changed, otherwise | Materialize or refresh a bare node and its edges to nodes already shown |
//! | Renamed | Remove the old node, wait for the index, then content changed on the new path |
//! | Deleted | Remove the node |
//!
//! Edges already materialized and still correct are left untouched so the
//! view keeps their selection and layout.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::builder::GraphBuilder;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::extract::ReferenceExtractor;
use crate::resolver::{Neighborhood, NeighborhoodResolver};
use crate::store::{DocumentStore, ReferenceIndex};
use crate::types::{
    ChangeEvent, EdgeKey, EdgeRecord, EntityId, EntityRecord, GraphPatch, RefreshAction,
    RefreshReport,
};
use crate::view::GraphView;

/// Result of diffing materialized edges against freshly computed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDiff {
    /// Materialized edges with no fresh counterpart.
    pub remove: Vec<EdgeRecord>,
    /// Fresh edges with no materialized counterpart.
    pub add: Vec<EdgeRecord>,
    /// Materialized edges that stay as they are.
    pub kept: Vec<EdgeRecord>,
}

impl EdgeDiff {
    /// Whether nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Diff two edge sets by structural identity.
///
/// A fresh edge first claims the materialized edge with the same id and key.
/// Remaining fresh edges are matched by key alone, as a multiset: `n`
/// materialized and `m` fresh edges with the same key keep `min(n, m)`
/// materialized edges (earliest first). An added edge therefore never
/// carries the id of a kept one.
pub fn diff_edges(materialized: &[EdgeRecord], fresh: &[EdgeRecord]) -> EdgeDiff {
    let mut kept = vec![false; materialized.len()];
    let mut claimed = vec![false; fresh.len()];

    let by_id: HashMap<&str, usize> = materialized
        .iter()
        .enumerate()
        .map(|(idx, edge)| (edge.edge_id.as_str(), idx))
        .collect();
    for (edge, claimed) in fresh.iter().zip(claimed.iter_mut()) {
        if let Some(&idx) = by_id.get(edge.edge_id.as_str()) {
            if !kept[idx] && materialized[idx].key() == edge.key() {
                kept[idx] = true;
                *claimed = true;
            }
        }
    }

    let mut pool: HashMap<EdgeKey, VecDeque<usize>> = HashMap::new();
    for (idx, edge) in materialized.iter().enumerate() {
        if !kept[idx] {
            pool.entry(edge.key()).or_default().push_back(idx);
        }
    }

    let mut add = Vec::new();
    for (edge, _) in fresh.iter().zip(&claimed).filter(|(_, claimed)| !**claimed) {
        match pool.get_mut(&edge.key()).and_then(|queue| queue.pop_front()) {
            Some(idx) => kept[idx] = true,
            None => add.push(edge.clone()),
        }
    }

    let (keep, remove): (Vec<_>, Vec<_>) = materialized
        .iter()
        .zip(kept)
        .partition(|(_, keep)| *keep);
    EdgeDiff {
        remove: remove.into_iter().map(|(e, _)| e.clone()).collect(),
        add,
        kept: keep.into_iter().map(|(e, _)| e.clone()).collect(),
    }
}

/// Keeps graph views in sync with the document store.
pub struct RefreshEngine<S, I> {
    builder: Arc<GraphBuilder<S, I>>,
    resolver: NeighborhoodResolver<S, I>,
    config: SyncConfig,
}

impl<S: DocumentStore, I: ReferenceIndex> RefreshEngine<S, I> {
    /// Create an engine over the given collaborators.
    pub fn new(store: Arc<S>, index: Arc<I>, config: SyncConfig) -> Result<Self, SyncError> {
        let extractor = ReferenceExtractor::new(&config.typed_link_prefix)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        let builder = Arc::new(GraphBuilder::new(
            store,
            index,
            extractor,
            config.merge_policy(),
        ));
        Ok(Self {
            resolver: NeighborhoodResolver::new(Arc::clone(&builder)),
            builder,
            config,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The neighborhood resolver.
    pub fn resolver(&self) -> &NeighborhoodResolver<S, I> {
        &self.resolver
    }

    /// The record and edge builder.
    pub fn builder(&self) -> &GraphBuilder<S, I> {
        &self.builder
    }

    /// Dispatch a change event to the matching handler.
    pub async fn handle(
        &self,
        view: &dyn GraphView,
        event: &ChangeEvent,
    ) -> Result<RefreshReport, SyncError> {
        match event {
            ChangeEvent::ContentChanged { path } => self.content_changed(view, path).await,
            ChangeEvent::Renamed { path, old_path } => self.renamed(view, path, old_path).await,
            ChangeEvent::Deleted { path } => self.deleted(view, path).await,
        }
    }

    /// Refresh the entity backed by `path` after its content changed.
    pub async fn content_changed(
        &self,
        view: &dyn GraphView,
        path: &str,
    ) -> Result<RefreshReport, SyncError> {
        let id = EntityId::from_path(path);
        let Some(record) = self.builder.load_record(path).await? else {
            debug!(entity = %id, "Document no longer exists");
            return Ok(remove_node(view, id));
        };

        let token = id.to_token();
        let expanded = view.lookup(&token).map_or(false, |n| n.expanded);
        let mut universe: BTreeSet<String> = view.node_tokens().into_iter().collect();
        let mut patch = GraphPatch::new();

        let (action, focus) = if expanded {
            let mut hood = self.resolver.resolve(std::slice::from_ref(&id)).await?;
            hood.nodes.insert(token.clone(), record);
            let focus = focus_of(view, &hood, &token);
            stage_neighborhood(view, &mut patch, &mut universe, hood);
            (RefreshAction::Expanded, focus)
        } else {
            stage_node(view, &mut patch, record.clone());
            universe.insert(token);
            (RefreshAction::Bare, vec![record])
        };

        self.reconcile_edges(view, &mut patch, &focus, &universe).await?;
        Ok(commit(view, patch, id, action))
    }

    /// Handle a rename from `old_path` to `path`.
    ///
    /// The old node is removed straight away. The new path is refreshed once
    /// the index reports it current, or after the settle timeout.
    pub async fn renamed(
        &self,
        view: &dyn GraphView,
        path: &str,
        old_path: &str,
    ) -> Result<RefreshReport, SyncError> {
        let old_id = EntityId::from_path(old_path);
        let from = old_id.to_token();
        let removal = remove_node(view, old_id);
        info!(from = %from, to = %path, removed = removal.nodes_removed, "Rename: old node dropped");

        self.await_index(path).await?;

        let refreshed = self.content_changed(view, path).await?;
        Ok(RefreshReport {
            entity: refreshed.entity,
            action: RefreshAction::Renamed { from },
            nodes_added: refreshed.nodes_added,
            nodes_removed: removal.nodes_removed + refreshed.nodes_removed,
            nodes_updated: refreshed.nodes_updated,
            edges_added: refreshed.edges_added,
            edges_removed: refreshed.edges_removed,
        })
    }

    /// Remove the node of a deleted document.
    pub async fn deleted(
        &self,
        view: &dyn GraphView,
        path: &str,
    ) -> Result<RefreshReport, SyncError> {
        Ok(remove_node(view, EntityId::from_path(path)))
    }

    /// Load the neighborhood of `seed` into the view and mark it expanded.
    pub async fn expand(
        &self,
        view: &dyn GraphView,
        seed: &EntityId,
    ) -> Result<RefreshReport, SyncError> {
        let token = seed.to_token();
        let hood = self.resolver.resolve(std::slice::from_ref(seed)).await?;

        let focus = focus_of(view, &hood, &token);

        let mut universe: BTreeSet<String> = view.node_tokens().into_iter().collect();
        let mut patch = GraphPatch::new();
        stage_neighborhood(view, &mut patch, &mut universe, hood);
        self.reconcile_edges(view, &mut patch, &focus, &universe).await?;

        if !view.lookup(&token).map_or(false, |n| n.expanded) {
            patch.mark_expanded.push(token);
        }
        Ok(commit(view, patch, seed.clone(), RefreshAction::Expanded))
    }

    /// Recompute the edges incident to `focus` among `universe` and stage
    /// the difference to what the view holds.
    async fn reconcile_edges(
        &self,
        view: &dyn GraphView,
        patch: &mut GraphPatch,
        focus: &[EntityRecord],
        universe: &BTreeSet<String>,
    ) -> Result<(), SyncError> {
        let focus_tokens: BTreeSet<String> = focus.iter().map(EntityRecord::token).collect();
        let focus_paths: BTreeSet<String> = focus
            .iter()
            .filter(|r| r.id.is_core())
            .filter_map(|r| r.path.clone())
            .collect();

        let mut fresh: Vec<EdgeRecord> = Vec::new();
        for record in focus {
            fresh.extend(
                self.builder
                    .edges_from(record, |t| universe.contains(t))
                    .await?,
            );
        }

        if !focus_paths.is_empty() {
            let links = self
                .builder
                .index()
                .forward_links()
                .await
                .map_err(SyncError::from_index)?;
            for (source, targets) in links {
                if targets.is_disjoint(&focus_paths) {
                    continue;
                }
                let source_token = EntityId::from_path(&source).to_token();
                if focus_tokens.contains(&source_token) || !universe.contains(&source_token) {
                    continue;
                }
                let Some(record) = self.builder.load_record(&source).await? else {
                    continue;
                };
                fresh.extend(
                    self.builder
                        .edges_from(&record, |t| focus_tokens.contains(t))
                        .await?,
                );
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let materialized: Vec<EdgeRecord> = focus_tokens
            .iter()
            .flat_map(|t| view.edges_incident_to(t))
            .filter(|e| seen.insert(e.edge_id.clone()))
            .collect();

        let diff = diff_edges(&materialized, &fresh);
        debug!(
            focus = focus_tokens.len(),
            fresh = fresh.len(),
            kept = diff.kept.len(),
            added = diff.add.len(),
            removed = diff.remove.len(),
            "Reconciled edges"
        );
        patch
            .remove_edges
            .extend(diff.remove.into_iter().map(|e| e.edge_id));
        patch.add_edges.extend(diff.add);
        Ok(())
    }

    /// Poll the index until it reflects `path` or the settle timeout passes.
    ///
    /// Returns whether the index caught up.
    async fn await_index(&self, path: &str) -> Result<bool, SyncError> {
        let settle = self.config.rename_settle;
        let deadline = Instant::now() + settle.timeout();
        loop {
            let current = self
                .builder
                .index()
                .is_current(path)
                .await
                .map_err(SyncError::from_index)?;
            if current {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                warn!(
                    path = %path,
                    timeout_ms = settle.timeout_ms,
                    "Index did not catch up with rename, refreshing anyway"
                );
                return Ok(false);
            }
            tokio::time::sleep(settle.poll_interval()).await;
        }
    }
}

/// Records whose edges must be rebuilt after loading `hood` around `seed`:
/// the seed itself, first, then every neighbor the view does not hold yet.
fn focus_of(view: &dyn GraphView, hood: &Neighborhood, seed: &str) -> Vec<EntityRecord> {
    let mut focus: Vec<EntityRecord> = hood
        .nodes
        .iter()
        .filter(|(t, _)| t.as_str() == seed || view.lookup(t).is_none())
        .map(|(_, r)| r.clone())
        .collect();
    focus.sort_by_key(|r| r.token() != seed);
    focus
}

fn stage_neighborhood(
    view: &dyn GraphView,
    patch: &mut GraphPatch,
    universe: &mut BTreeSet<String>,
    hood: Neighborhood,
) {
    for (token, record) in hood.nodes {
        stage_node(view, patch, record);
        universe.insert(token);
    }
}

/// Remove the node for `id`; a no-op if the view does not hold it.
fn remove_node(view: &dyn GraphView, id: EntityId) -> RefreshReport {
    let token = id.to_token();
    if view.lookup(&token).is_none() {
        debug!(entity = %token, "Node not materialized, nothing to remove");
        return RefreshReport::noop(id);
    }
    let patch = GraphPatch {
        remove_nodes: vec![token],
        ..GraphPatch::new()
    };
    commit(view, patch, id, RefreshAction::Removed)
}

/// Stage a node as added, updated, or nothing if the view already holds
/// an identical record.
fn stage_node(view: &dyn GraphView, patch: &mut GraphPatch, record: EntityRecord) {
    match view.lookup(&record.token()) {
        None => patch.add_nodes.push(record),
        Some(node) if node.record != record => patch.update_nodes.push(record),
        Some(_) => {}
    }
}

/// Apply a patch and notify the view if anything changed.
fn commit(
    view: &dyn GraphView,
    patch: GraphPatch,
    entity: EntityId,
    action: RefreshAction,
) -> RefreshReport {
    let report = RefreshReport::from_patch(entity, action, &patch);
    if patch.is_empty() {
        debug!(entity = %report.entity, "No changes");
        return report;
    }
    let structure_changed = patch.structure_changed();
    let data_changed = patch.data_changed();
    view.apply(patch);
    if structure_changed || data_changed {
        view.on_graph_changed(structure_changed, data_changed);
    }
    debug!(
        view = %view.view_id(),
        entity = %report.entity,
        action = ?report.action,
        nodes_added = report.nodes_added,
        nodes_removed = report.nodes_removed,
        nodes_updated = report.nodes_updated,
        edges_added = report.edges_added,
        edges_removed = report.edges_removed,
        "Applied patch"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::assign_edge_ids;
    use crate::store::InMemoryVault;
    use crate::types::EdgeCandidate;
    use crate::view::InMemoryGraphView;

    fn edge(from: &str, to: &str, edge_type: &str) -> EdgeRecord {
        let mut edges = vec![EdgeRecord::from_candidate(EdgeCandidate::new(
            EntityId::core(from),
            EntityId::core(to),
            edge_type,
            "",
        ))];
        assign_edge_ids(&mut edges);
        edges.remove(0)
    }

    fn engine(vault: Arc<InMemoryVault>) -> RefreshEngine<InMemoryVault, InMemoryVault> {
        RefreshEngine::new(Arc::clone(&vault), vault, SyncConfig::default()).unwrap()
    }

    #[test]
    fn test_diff_basic() {
        let a = edge("X", "A", "r");
        let b = edge("X", "B", "r");
        let c = edge("X", "C", "r");
        let d = edge("X", "D", "r");

        let diff = diff_edges(&[a.clone(), b.clone(), c.clone()], &[b.clone(), c.clone(), d.clone()]);
        assert_eq!(diff.remove, vec![a]);
        assert_eq!(diff.add, vec![d]);
        assert_eq!(diff.kept, vec![b, c]);
    }

    #[test]
    fn test_diff_ignores_edge_id() {
        let mut old = edge("X", "A", "r");
        old.edge_id = "host-assigned".to_string();
        let diff = diff_edges(&[old.clone()], &[edge("X", "A", "r")]);
        assert!(diff.is_empty());
        assert_eq!(diff.kept, vec![old]);
    }

    #[test]
    fn test_diff_multiset() {
        let e = edge("X", "A", "r");
        let diff = diff_edges(&[e.clone()], &[e.clone(), e.clone()]);
        assert_eq!(diff.add.len(), 1);
        let diff = diff_edges(&[e.clone(), e.clone()], &[e]);
        assert_eq!(diff.remove.len(), 1);
    }

    #[test]
    fn test_diff_matches_by_id_before_structure() {
        let mut twins: Vec<EdgeRecord> = (0..2)
            .map(|_| {
                EdgeRecord::from_candidate(EdgeCandidate::new(
                    EntityId::core("X"),
                    EntityId::core("A"),
                    "r",
                    "",
                ))
            })
            .collect();
        assign_edge_ids(&mut twins);
        assert_ne!(twins[0].edge_id, twins[1].edge_id);

        // Only the second twin survived an earlier refresh.
        let diff = diff_edges(&[twins[1].clone()], &twins);
        assert_eq!(diff.kept, vec![twins[1].clone()]);
        assert_eq!(diff.add, vec![twins[0].clone()]);
        assert!(diff.remove.is_empty());
        for added in &diff.add {
            assert!(diff.kept.iter().all(|k| k.edge_id != added.edge_id));
        }
    }

    #[tokio::test]
    async fn test_content_changed_for_missing_document_removes_node() {
        let vault = Arc::new(InMemoryVault::new());
        let view = InMemoryGraphView::new();
        view.insert_node(EntityRecord::document(EntityId::core("A"), "A.md", ""), false);

        let report = engine(vault).content_changed(&view, "A.md").await.unwrap();
        assert_eq!(report.action, RefreshAction::Removed);
        assert_eq!(view.node_count(), 0);
    }

    #[tokio::test]
    async fn test_bare_refresh_links_to_shown_nodes_only() {
        let vault = Arc::new(InMemoryVault::new());
        vault.put("A.md", "[[B]] [[C]]");
        vault.put("B.md", "[[A]]");
        vault.put("C.md", "");
        let view = InMemoryGraphView::new();
        view.insert_node(EntityRecord::document(EntityId::core("B"), "B.md", "[[A]]"), false);

        let report = engine(vault).content_changed(&view, "A.md").await.unwrap();
        assert_eq!(report.action, RefreshAction::Bare);
        assert_eq!(report.nodes_added, 1);
        assert_eq!(report.edges_added, 2, "A->B and B->A");
        assert!(view.lookup("core:C").is_none());
        assert_eq!(view.notifications(), vec![(true, false)]);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_noop() {
        let vault = Arc::new(InMemoryVault::new());
        let view = InMemoryGraphView::new();
        let report = engine(vault).deleted(&view, "A.md").await.unwrap();
        assert_eq!(report.action, RefreshAction::NoOp);
        assert!(view.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_expand_twice_is_idempotent() {
        let vault = Arc::new(InMemoryVault::new());
        vault.put("A.md", "[[B]]");
        vault.put("B.md", "");
        vault.put("C.md", "[[A]]");
        let view = InMemoryGraphView::new();
        let engine = engine(vault);

        let first = engine.expand(&view, &EntityId::core("A")).await.unwrap();
        assert_eq!(first.nodes_added, 3);
        assert_eq!(first.edges_added, 2);
        assert!(view.lookup("core:A").unwrap().expanded);

        let second = engine.expand(&view, &EntityId::core("A")).await.unwrap();
        assert!(!second.changed_structure());
        assert_eq!(view.patches_applied(), 1);
    }

    #[tokio::test]
    async fn test_bad_prefix_still_builds() {
        let vault = Arc::new(InMemoryVault::new());
        let config = SyncConfig {
            typed_link_prefix: "([".to_string(),
            ..SyncConfig::default()
        };
        assert!(RefreshEngine::new(Arc::clone(&vault), vault, config).is_ok());
    }
}
