//! Entity identifiers.
//!
//! An [`EntityId`] names one node of the derived graph by a human-readable
//! key plus the tag of the store it originates from. Its token form
//! (`origin:key`) is the primary key of the materialized graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CORE_ORIGIN, TOKEN_SEPARATOR};

/// Error returned when a token cannot be parsed back into an [`EntityId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenParseError {
    /// The token has no origin/key separator.
    #[error("Token has no separator: {0}")]
    MissingSeparator(String),
    /// The origin part contains an invalid escape sequence.
    #[error("Invalid escape in token origin: {0}")]
    InvalidEscape(String),
}

/// Unique identifier for an entity in the derived graph.
///
/// Equality is structural over `(key, origin)`. Ordering is by origin first,
/// then key, so identifiers from one store sort together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    /// Origin store tag (e.g. `core` for the primary document store).
    pub origin: String,
    /// Human-readable key within the origin.
    pub key: String,
}

impl EntityId {
    /// Create an identifier from a raw key and origin tag.
    pub fn new(key: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            origin: origin.into(),
        }
    }

    /// Create an identifier in the primary document store.
    pub fn core(key: impl Into<String>) -> Self {
        Self::new(key, CORE_ORIGIN)
    }

    /// Create an identifier from a document's canonical path.
    ///
    /// The key is the file stem: directories and a trailing `.md` are
    /// dropped, so `notes/Alpha.md` and a reference to `Alpha` agree.
    pub fn from_path(path: &str) -> Self {
        Self::core(path_key(path))
    }

    /// Create the identifier a link target points to.
    ///
    /// Used for dangling placeholders; applies the same normalization as
    /// [`EntityId::from_path`] so a placeholder is promoted in place once its
    /// document appears.
    pub fn from_link(link_target: &str) -> Self {
        Self::core(path_key(link_target))
    }

    /// Whether this entity lives in the primary document store.
    pub fn is_core(&self) -> bool {
        self.origin == CORE_ORIGIN
    }

    /// Serialize to a single token: escaped origin, separator, raw key.
    ///
    /// The origin is escaped so it never contains the separator; the first
    /// separator in a token therefore always ends the origin, which makes
    /// the mapping injective even when keys contain the separator.
    pub fn to_token(&self) -> String {
        let mut token = escape_origin(&self.origin);
        token.push(TOKEN_SEPARATOR);
        token.push_str(&self.key);
        token
    }

    /// Parse a token produced by [`EntityId::to_token`].
    pub fn from_token(token: &str) -> Result<Self, TokenParseError> {
        let (origin, key) = token
            .split_once(TOKEN_SEPARATOR)
            .ok_or_else(|| TokenParseError::MissingSeparator(token.to_string()))?;
        Ok(Self {
            origin: unescape_origin(origin)?,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.origin
            .cmp(&other.origin)
            .then_with(|| self.key.cmp(&other.key))
    }
}

fn path_key(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path).trim();
    let ext = name
        .len()
        .checked_sub(3)
        .and_then(|cut| name.get(cut..).map(|ext| (cut, ext)));
    match ext {
        Some((cut, ext)) if ext.eq_ignore_ascii_case(".md") => name[..cut].to_string(),
        _ => name.to_string(),
    }
}

fn escape_origin(origin: &str) -> String {
    let mut out = String::with_capacity(origin.len());
    for c in origin.chars() {
        match c {
            '%' => out.push_str("%25"),
            c if c == TOKEN_SEPARATOR => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_origin(escaped: &str) -> Result<String, TokenParseError> {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3);
        match code {
            Some("25") => out.push('%'),
            Some("3A") => out.push(TOKEN_SEPARATOR),
            _ => return Err(TokenParseError::InvalidEscape(escaped.to_string())),
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
