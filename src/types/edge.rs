//! Edge types for the derived graph.

use serde::{Deserialize, Serialize};

use super::identifier::EntityId;
use crate::INLINE_EDGE_TYPE;

/// A raw edge candidate, before merging.
///
/// One candidate is produced per reference occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCandidate {
    /// Entity holding the reference.
    pub source: EntityId,
    /// Entity the reference points to (possibly dangling).
    pub target: EntityId,
    /// Relation label, [`INLINE_EDGE_TYPE`] for untyped references.
    pub edge_type: String,
    /// Text surrounding the reference.
    pub context: String,
}

impl EdgeCandidate {
    /// Create a new candidate.
    pub fn new(
        source: EntityId,
        target: EntityId,
        edge_type: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            edge_type: edge_type.into(),
            context: context.into(),
        }
    }

    /// Whether this is an untyped (inline) reference.
    pub fn is_inline(&self) -> bool {
        self.edge_type == INLINE_EDGE_TYPE
    }
}

/// A finalized edge, as materialized in a graph view.
///
/// `edge_id` is derived from [`EdgeKey`] plus an ordinal, so the same logical
/// edge gets the same id on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Identifier unique within a materialized graph.
    pub edge_id: String,
    /// Source entity. Direction is preserved.
    pub source: EntityId,
    /// Target entity.
    pub target: EntityId,
    /// Relation label.
    pub edge_type: String,
    /// Context text; merged inline edges join their contexts.
    pub context: String,
    /// Number of raw references this edge stands for.
    pub merged_count: u32,
}

impl EdgeRecord {
    /// Create an unmerged record from a candidate. The id is left empty
    /// until assigned by the merge policy.
    pub fn from_candidate(candidate: EdgeCandidate) -> Self {
        Self {
            edge_id: String::new(),
            source: candidate.source,
            target: candidate.target,
            edge_type: candidate.edge_type,
            context: candidate.context,
            merged_count: 1,
        }
    }

    /// Whether this edge has the default untyped relation.
    pub fn is_inline(&self) -> bool {
        self.edge_type == INLINE_EDGE_TYPE
    }

    /// Whether the edge touches the given entity token.
    pub fn is_incident_to(&self, token: &str) -> bool {
        self.source.to_token() == token || self.target.to_token() == token
    }

    /// Structural identity used for diffing, independent of `edge_id`.
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.to_token(),
            target: self.target.to_token(),
            edge_type: self.edge_type.clone(),
            content: self.is_inline().then(|| self.context.clone()),
        }
    }
}

/// Structural identity of an edge: endpoints and type, plus the merged
/// content for inline edges.
///
/// Typed edges between the same pair with the same label share a key; the
/// diff treats keys as a multiset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source token.
    pub source: String,
    /// Target token.
    pub target: String,
    /// Relation label.
    pub edge_type: String,
    /// Merged context, inline edges only.
    pub content: Option<String>,
}
