//! Engine configuration.
//!
//! ## Environment
//!
//! [`SyncConfig::from_env`] reads:
//! - `LINKGRAPH_TYPED_PREFIX`: typed-reference line prefix (default `"- "`)
//! - `LINKGRAPH_MERGE_INLINE`: `true`/`false` (default `true`)
//! - `LINKGRAPH_RENAME_POLL_MS`: index poll interval after a rename (default 25)
//! - `LINKGRAPH_RENAME_TIMEOUT_MS`: give up waiting for the index (default 1000)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::policy::EdgeMergePolicy;

/// How long to wait for the reference index to catch up with a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameSettle {
    /// Delay between `is_current` polls.
    pub poll_interval_ms: u64,
    /// Upper bound on the total wait.
    pub timeout_ms: u64,
}

impl RenameSettle {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RenameSettle {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            timeout_ms: 1000,
        }
    }
}

/// Configuration consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix marking typed-reference lines.
    pub typed_link_prefix: String,
    /// Collapse inline edges between the same pair.
    pub merge_inline_edges: bool,
    /// Rename settle behaviour.
    pub rename_settle: RenameSettle,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            typed_link_prefix: "- ".to_string(),
            merge_inline_edges: true,
            rename_settle: RenameSettle::default(),
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `LINKGRAPH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Values that fail to parse keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(prefix) = lookup("LINKGRAPH_TYPED_PREFIX") {
            config.typed_link_prefix = prefix;
        }
        if let Some(merge) = parse_var(&lookup, "LINKGRAPH_MERGE_INLINE") {
            config.merge_inline_edges = merge;
        }
        if let Some(ms) = parse_var(&lookup, "LINKGRAPH_RENAME_POLL_MS") {
            config.rename_settle.poll_interval_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "LINKGRAPH_RENAME_TIMEOUT_MS") {
            config.rename_settle.timeout_ms = ms;
        }
        config
    }

    /// Merge policy derived from this config.
    pub fn merge_policy(&self) -> EdgeMergePolicy {
        EdgeMergePolicy::new(self.merge_inline_edges)
    }

    /// Hash of the config, for telling apart views built with different
    /// settings.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self).unwrap_or_default()
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.typed_link_prefix, "- ");
        assert!(config.merge_inline_edges);
        assert!(config.merge_policy().merge_inline);
    }

    #[test]
    fn test_lookup_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("LINKGRAPH_TYPED_PREFIX", "* "),
            ("LINKGRAPH_MERGE_INLINE", "false"),
            ("LINKGRAPH_RENAME_POLL_MS", "oops"),
            ("LINKGRAPH_RENAME_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();
        let config = SyncConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.typed_link_prefix, "* ");
        assert!(!config.merge_inline_edges);
        assert_eq!(config.rename_settle.poll_interval_ms, 25);
        assert_eq!(config.rename_settle.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let a = SyncConfig::default();
        let mut b = SyncConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.merge_inline_edges = false;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SyncConfig = serde_json::from_str(r#"{"merge_inline_edges": false}"#).unwrap();
        assert!(!config.merge_inline_edges);
        assert_eq!(config.typed_link_prefix, "- ");
    }
}
