//! Merging of edge candidates between the same pair of entities.
//!
//! ## Rules
//!
//! - Typed candidates always become one edge each.
//! - Inline candidates for the same ordered pair collapse into a single
//!   carrier edge: the first one seen. Later contexts are appended with
//!   [`CONTEXT_SEPARATOR`] and `merged_count` counts the candidates.
//! - With merging disabled every candidate becomes its own edge.
//!
//! Output is a pure function of input order, so unchanged input always
//! yields identical edges and ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::canonical::edge_id;
use crate::types::{EdgeCandidate, EdgeKey, EdgeRecord, EntityId};

/// Separator placed between contexts of merged inline edges.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Decides how many edges to emit per entity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMergePolicy {
    /// Collapse inline edges between the same pair.
    pub merge_inline: bool,
}

impl Default for EdgeMergePolicy {
    fn default() -> Self {
        Self { merge_inline: true }
    }
}

impl EdgeMergePolicy {
    /// Create a policy.
    pub fn new(merge_inline: bool) -> Self {
        Self { merge_inline }
    }

    /// Merge candidates that all share one `(source, target)` pair.
    ///
    /// Ids are not assigned; see [`EdgeMergePolicy::merge`].
    pub fn merge_pair(&self, candidates: Vec<EdgeCandidate>) -> Vec<EdgeRecord> {
        let mut out: Vec<EdgeRecord> = Vec::with_capacity(candidates.len());
        let mut carrier: Option<usize> = None;

        for candidate in candidates {
            if !(self.merge_inline && candidate.is_inline()) {
                out.push(EdgeRecord::from_candidate(candidate));
                continue;
            }
            match carrier {
                Some(idx) => {
                    let edge = &mut out[idx];
                    edge.context.push_str(CONTEXT_SEPARATOR);
                    edge.context.push_str(&candidate.context);
                    edge.merged_count += 1;
                }
                None => {
                    carrier = Some(out.len());
                    out.push(EdgeRecord::from_candidate(candidate));
                }
            }
        }
        out
    }

    /// Merge an arbitrary candidate list and assign stable edge ids.
    ///
    /// Candidates are grouped by ordered pair in first-seen order.
    pub fn merge(&self, candidates: Vec<EdgeCandidate>) -> Vec<EdgeRecord> {
        let mut order: Vec<(EntityId, EntityId)> = Vec::new();
        let mut groups: HashMap<(EntityId, EntityId), Vec<EdgeCandidate>> = HashMap::new();

        for candidate in candidates {
            let pair = (candidate.source.clone(), candidate.target.clone());
            groups
                .entry(pair.clone())
                .or_insert_with(|| {
                    order.push(pair);
                    Vec::new()
                })
                .push(candidate);
        }

        let mut edges: Vec<EdgeRecord> = order
            .into_iter()
            .filter_map(|pair| groups.remove(&pair))
            .flat_map(|group| self.merge_pair(group))
            .collect();
        assign_edge_ids(&mut edges);
        edges
    }
}

/// Give each edge a stable id: a digest of its structural key plus its
/// ordinal among edges with an identical key.
pub fn assign_edge_ids(edges: &mut [EdgeRecord]) {
    let mut seen: HashMap<EdgeKey, usize> = HashMap::new();
    for edge in edges.iter_mut() {
        let key = edge.key();
        let ordinal = seen.entry(key.clone()).or_insert(0);
        edge.edge_id = edge_id(&key, *ordinal);
        *ordinal += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INLINE_EDGE_TYPE;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn inline(target: &str, context: &str) -> EdgeCandidate {
        EdgeCandidate::new(EntityId::core("Src"), EntityId::core(target), INLINE_EDGE_TYPE, context)
    }

    fn typed(target: &str, label: &str, context: &str) -> EdgeCandidate {
        EdgeCandidate::new(EntityId::core("Src"), EntityId::core(target), label, context)
    }

    #[test]
    fn test_inline_collapse() {
        let policy = EdgeMergePolicy::new(true);
        let out = policy.merge_pair(vec![inline("B", "one"), inline("B", "two"), inline("B", "three")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].merged_count, 3);
        assert_eq!(out[0].context, format!("one{0}two{0}three", CONTEXT_SEPARATOR));
    }

    #[test]
    fn test_typed_kept_distinct() {
        let policy = EdgeMergePolicy::new(true);
        let out = policy.merge_pair(vec![
            typed("B", "supports", "x"),
            inline("B", "a"),
            typed("B", "supports", "y"),
            inline("B", "b"),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].edge_type, "supports");
        assert!(out[1].is_inline());
        assert_eq!(out[1].merged_count, 2);
        assert_eq!(out[2].context, "y");
    }

    #[test]
    fn test_merge_disabled() {
        let policy = EdgeMergePolicy::new(false);
        let out = policy.merge(vec![inline("B", "one"), inline("B", "two"), typed("B", "r", "")]);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|e| e.merged_count == 1));
        let ids: HashSet<_> = out.iter().map(|e| e.edge_id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_merge_groups_by_pair_in_first_seen_order() {
        let policy = EdgeMergePolicy::default();
        let out = policy.merge(vec![inline("C", "c1"), inline("B", "b1"), inline("C", "c2")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].target, EntityId::core("C"));
        assert_eq!(out[0].merged_count, 2);
        assert_eq!(out[1].target, EntityId::core("B"));
    }

    #[test]
    fn test_ids_unique_for_identical_typed_edges() {
        let policy = EdgeMergePolicy::default();
        let out = policy.merge(vec![typed("B", "r", "x"), typed("B", "r", "x")]);
        assert_eq!(out.len(), 2);
        assert_ne!(out[0].edge_id, out[1].edge_id);
    }

    #[test]
    fn test_repeated_runs_identical() {
        let policy = EdgeMergePolicy::default();
        let input = vec![inline("B", "1"), typed("C", "r", "2"), inline("B", "3")];
        assert_eq!(policy.merge(input.clone()), policy.merge(input));
    }

    proptest! {
        #[test]
        fn prop_inline_count(contexts in proptest::collection::vec("[a-z]{0,5}", 1..20)) {
            let candidates: Vec<_> = contexts.iter().map(|c| inline("B", c)).collect();

            let merged = EdgeMergePolicy::new(true).merge(candidates.clone());
            prop_assert_eq!(merged.len(), 1);
            prop_assert_eq!(merged[0].merged_count as usize, contexts.len());
            prop_assert_eq!(&merged[0].context, &contexts.join(CONTEXT_SEPARATOR));

            let split = EdgeMergePolicy::new(false).merge(candidates);
            prop_assert_eq!(split.len(), contexts.len());
            let ids: HashSet<_> = split.iter().map(|e| e.edge_id.clone()).collect();
            prop_assert_eq!(ids.len(), contexts.len());
        }
    }
}
