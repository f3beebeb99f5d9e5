//! Core types for the graph synchronization engine.

pub mod identifier;
pub mod entity;
pub mod edge;
pub mod reference;
pub mod patch;
pub mod event;

pub use identifier::{EntityId, TokenParseError};
pub use entity::{EntityRecord, MaterializedNode};
pub use edge::{EdgeCandidate, EdgeKey, EdgeRecord};
pub use reference::{RawReference, Span};
pub use event::ChangeEvent;
pub use patch::{GraphPatch, RefreshAction, RefreshReport};
