//! Edge merge policy.

pub mod merge;

pub use merge::{assign_edge_ids, EdgeMergePolicy, CONTEXT_SEPARATOR};
