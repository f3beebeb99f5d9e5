//! Stable hashing for identifiers that must survive refreshes.
//!
//! Edge ids and config fingerprints are xxh64 digests over length-prefixed
//! parts, so `("ab", "c")` and `("a", "bc")` never hash the same input.

use serde::Serialize;
use xxhash_rust::xxh64::Xxh64;

use crate::types::EdgeKey;

/// Hash a sequence of string parts and return the digest as hex.
pub fn stable_hash_hex<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Xxh64::new(0);
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    format!("{:016x}", hasher.digest())
}

/// Stable id for the `ordinal`-th edge with the given structural key.
pub fn edge_id(key: &EdgeKey, ordinal: usize) -> String {
    let ordinal = ordinal.to_string();
    let content_flag = if key.content.is_some() { "c" } else { "-" };
    let digest = stable_hash_hex([
        key.source.as_str(),
        key.target.as_str(),
        key.edge_type.as_str(),
        content_flag,
        key.content.as_deref().unwrap_or(""),
        ordinal.as_str(),
    ]);
    format!("e{digest}")
}

/// Hash any serializable value via its JSON form.
///
/// Returns `None` if the value cannot be serialized.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Option<String> {
    let bytes = serde_json::to_vec(value).ok()?;
    let mut hasher = Xxh64::new(0);
    hasher.update(&bytes);
    Some(format!("{:016x}", hasher.digest()))
}
