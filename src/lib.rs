//! # linkgraph-sync
//!
//! Incremental graph synchronization for collections of linked documents.
//!
//! The engine answers one question:
//!
//! > A document just changed. What is the smallest edit that brings every
//! > open graph view back in line with the corpus?
//!
//! ## Core Contract
//!
//! 1. Name every node by a stable, injective token (`origin:key`)
//! 2. Turn a document's references into typed or inline edges, merging
//!    repeated inline links between the same pair
//! 3. On a change, recompute only the edges incident to the affected node
//!    and apply the difference as a [`GraphPatch`]
//!
//! ## Architecture
//!
//! ```text
//! ChangeEvent → ChangeEventRouter → per-view worker → RefreshEngine → GraphPatch → GraphView
//!                                                          ↓
//!                                   NeighborhoodResolver / GraphBuilder
//!                                                          ↓
//!                                   DocumentStore + ReferenceIndex (host provided)
//! ```
//!
//! ## Guarantees
//!
//! - Same document content + same config → identical edges and edge ids
//! - Edges that are still correct are never removed and re-added
//! - Events for one view are applied in arrival order
//! - A failed refresh in one view never blocks another

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod config;
pub mod error;
pub mod extract;
pub mod policy;
pub mod store;
pub mod view;
pub mod builder;
pub mod resolver;
pub mod refresh;
pub mod router;
pub mod logging;

// Re-exports
pub use types::{
    ChangeEvent, EdgeCandidate, EdgeKey, EdgeRecord, EntityId, EntityRecord, GraphPatch,
    MaterializedNode, RawReference, RefreshAction, RefreshReport, Span, TokenParseError,
};
pub use canonical::{canonical_hash_hex, edge_id, stable_hash_hex};
pub use config::{RenameSettle, SyncConfig};
pub use error::SyncError;
pub use extract::{ExtractedReference, ReferenceExtractor};
pub use policy::{assign_edge_ids, EdgeMergePolicy, CONTEXT_SEPARATOR};
pub use store::{DocumentMeta, DocumentStore, InMemoryError, InMemoryVault, ReferenceIndex};
pub use view::{GraphView, InMemoryGraphView, ViewId};
pub use builder::{GraphBuilder, ResolvedReference};
pub use resolver::{Neighborhood, NeighborhoodResolver};
pub use refresh::{diff_edges, EdgeDiff, RefreshEngine};
pub use router::{ChangeEventRouter, DispatchTicket, RefreshResult, ViewRegistry};
pub use logging::{init_tracing, LogFormat};

/// Origin tag of the primary document store.
pub const CORE_ORIGIN: &str = "core";

/// Separator between origin and key in a token.
pub const TOKEN_SEPARATOR: char = ':';

/// Edge type of references written inline in running text.
pub const INLINE_EDGE_TYPE: &str = "inline";
