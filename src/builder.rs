//! Record loading and edge building.
//!
//! The builder is the only place that talks to the collaborators: it loads
//! entity records, resolves reference targets and turns a document's
//! references into merged edges.

use std::sync::Arc;

use crate::error::SyncError;
use crate::extract::ReferenceExtractor;
use crate::policy::EdgeMergePolicy;
use crate::store::{DocumentStore, ReferenceIndex};
use crate::types::{EdgeCandidate, EdgeRecord, EntityId, EntityRecord};

/// A reference with its target resolved (or not) against the store.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// Resolved target id; a link-derived id when unresolved.
    pub target: EntityId,
    /// Target document path, `None` when the reference dangles.
    pub target_path: Option<String>,
    /// Relation label.
    pub edge_type: String,
    /// Context text.
    pub context: String,
}

/// Loads records and builds edges from the document store and index.
pub struct GraphBuilder<S, I> {
    store: Arc<S>,
    index: Arc<I>,
    extractor: ReferenceExtractor,
    policy: EdgeMergePolicy,
}

impl<S: DocumentStore, I: ReferenceIndex> GraphBuilder<S, I> {
    /// Create a builder.
    pub fn new(
        store: Arc<S>,
        index: Arc<I>,
        extractor: ReferenceExtractor,
        policy: EdgeMergePolicy,
    ) -> Self {
        Self {
            store,
            index,
            extractor,
            policy,
        }
    }

    /// The reference index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// The merge policy in use.
    pub fn policy(&self) -> EdgeMergePolicy {
        self.policy
    }

    /// Load the record of the document at `path`, `None` if it is gone.
    pub async fn load_record(&self, path: &str) -> Result<Option<EntityRecord>, SyncError> {
        self.load_as(EntityId::from_path(path), path).await
    }

    /// Load the record at `path`, or a dangling placeholder if it is gone.
    pub async fn record_for_path(&self, path: &str) -> Result<EntityRecord, SyncError> {
        Ok(self
            .load_record(path)
            .await?
            .unwrap_or_else(|| EntityRecord::dangling(EntityId::from_path(path))))
    }

    /// Find the document backing an entity, if any.
    pub fn locate(&self, id: &EntityId) -> Option<String> {
        if !id.is_core() {
            return None;
        }
        self.store.resolve(&id.key, "")
    }

    /// Load an entity's record; unresolvable entities become placeholders.
    pub async fn load_entity(&self, id: &EntityId) -> Result<EntityRecord, SyncError> {
        if let Some(path) = self.locate(id) {
            if let Some(record) = self.load_as(id.clone(), &path).await? {
                return Ok(record);
            }
        }
        Ok(EntityRecord::dangling(id.clone()))
    }

    async fn load_as(&self, id: EntityId, path: &str) -> Result<Option<EntityRecord>, SyncError> {
        let Some(content) = self.store.read(path).await.map_err(SyncError::from_store)? else {
            return Ok(None);
        };
        let meta = self.store.metadata(path).await.map_err(SyncError::from_store)?;
        Ok(Some(
            EntityRecord::document(id, path, content)
                .with_tags(meta.tags)
                .with_properties(meta.properties),
        ))
    }

    /// Outgoing references of a record, classified and resolved.
    ///
    /// Dangling and foreign records have none.
    pub async fn references_of(
        &self,
        record: &EntityRecord,
    ) -> Result<Vec<ResolvedReference>, SyncError> {
        let Some(path) = record.path.as_deref() else {
            return Ok(Vec::new());
        };
        let raw = self
            .index
            .references(path)
            .await
            .map_err(SyncError::from_index)?;

        Ok(self
            .extractor
            .extract(&record.content, &raw)
            .into_iter()
            .map(|r| {
                let target_path = self.store.resolve(&r.target, path);
                let target = match &target_path {
                    Some(p) => EntityId::from_path(p),
                    None => EntityId::from_link(&r.target),
                };
                ResolvedReference {
                    target,
                    target_path,
                    edge_type: r.edge_type,
                    context: r.context,
                }
            })
            .collect())
    }

    /// Merged outgoing edges of `record` whose target token passes `keep`.
    pub async fn edges_from<F>(
        &self,
        record: &EntityRecord,
        keep: F,
    ) -> Result<Vec<EdgeRecord>, SyncError>
    where
        F: Fn(&str) -> bool + Send,
    {
        let candidates: Vec<EdgeCandidate> = self
            .references_of(record)
            .await?
            .into_iter()
            .filter(|r| keep(&r.target.to_token()))
            .map(|r| EdgeCandidate::new(record.id.clone(), r.target, r.edge_type, r.context))
            .collect();
        Ok(self.policy.merge(candidates))
    }
}
