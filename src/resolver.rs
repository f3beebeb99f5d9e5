//! Neighborhood resolution.
//!
//! Given seed entities, collects the seeds themselves, everything they
//! reference and everything that references them. Nothing further than one
//! hop is ever loaded.
//!
//! ## Cost
//!
//! The back-reference scan walks the corpus-wide forward-link index. It runs
//! at most once per call, only when a seed is a document of the primary
//! store, and never reloads an entity already collected.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::builder::GraphBuilder;
use crate::error::SyncError;
use crate::store::{DocumentStore, ReferenceIndex};
use crate::types::{EntityId, EntityRecord};

/// Entities within one hop of a seed set, keyed by token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhood {
    /// Collected records by token.
    pub nodes: BTreeMap<String, EntityRecord>,
}

impl Neighborhood {
    /// Whether a token is part of the neighborhood.
    pub fn contains(&self, token: &str) -> bool {
        self.nodes.contains_key(token)
    }

    /// Record for a token.
    pub fn get(&self, token: &str) -> Option<&EntityRecord> {
        self.nodes.get(token)
    }

    /// Number of collected entities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Computes one-hop neighborhoods.
pub struct NeighborhoodResolver<S, I> {
    builder: Arc<GraphBuilder<S, I>>,
}

impl<S: DocumentStore, I: ReferenceIndex> NeighborhoodResolver<S, I> {
    /// Create a resolver over a shared builder.
    pub fn new(builder: Arc<GraphBuilder<S, I>>) -> Self {
        Self { builder }
    }

    /// Resolve the neighborhood of `seeds`.
    ///
    /// Unresolvable targets become dangling placeholders; only collaborator
    /// I/O failures abort the call.
    pub async fn resolve(&self, seeds: &[EntityId]) -> Result<Neighborhood, SyncError> {
        let mut nodes: BTreeMap<String, EntityRecord> = BTreeMap::new();
        let mut seed_records: Vec<EntityRecord> = Vec::new();
        let mut backlink_paths: BTreeSet<String> = BTreeSet::new();

        for seed in seeds {
            let token = seed.to_token();
            if nodes.contains_key(&token) {
                continue;
            }
            let record = self.builder.load_entity(seed).await?;
            if record.id.is_core() {
                if let Some(path) = &record.path {
                    backlink_paths.insert(path.clone());
                }
            }
            seed_records.push(record.clone());
            nodes.insert(token, record);
        }

        for seed in &seed_records {
            for reference in self.builder.references_of(seed).await? {
                let token = reference.target.to_token();
                if nodes.contains_key(&token) {
                    continue;
                }
                let record = match &reference.target_path {
                    Some(path) => self.builder.record_for_path(path).await?,
                    None => EntityRecord::dangling(reference.target),
                };
                nodes.insert(token, record);
            }
        }

        if !backlink_paths.is_empty() {
            let links = self
                .builder
                .index()
                .forward_links()
                .await
                .map_err(SyncError::from_index)?;
            for (source, targets) in links {
                if targets.is_disjoint(&backlink_paths) {
                    continue;
                }
                let token = EntityId::from_path(&source).to_token();
                if nodes.contains_key(&token) {
                    continue;
                }
                let record = self.builder.record_for_path(&source).await?;
                nodes.insert(token, record);
            }
        }

        tracing::debug!(
            seeds = seeds.len(),
            nodes = nodes.len(),
            backlink_scan = !backlink_paths.is_empty(),
            "Resolved neighborhood"
        );
        Ok(Neighborhood { nodes })
    }
}
