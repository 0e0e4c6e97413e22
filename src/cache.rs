//! Optional memoization of routing results.
//!
//! Keys are a SHA-256 fingerprint of the prompt prefix and the working
//! directory. Eviction is a pure function over the map so the age boundary
//! can be tested without touching disk.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::scoring::RuleMatch;

/// Characters of the prompt that feed the fingerprint
pub const FINGERPRINT_PROMPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// Epoch milliseconds at insertion
    pub ts: i64,
    pub value: V,
}

pub type CacheMap<V> = HashMap<String, CacheEntry<V>>;

/// Lookup key for a prompt in a directory
pub fn fingerprint(prompt: &str, cwd: &str) -> String {
    let prefix: String = prompt.chars().take(FINGERPRINT_PROMPT_CHARS).collect();
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    hasher.update(cwd.as_bytes());
    hex::encode(hasher.finalize())
}

/// Copy of `cache` keeping only entries younger than `ttl_ms` at `now_ms`.
/// Entries whose age overflows are dropped.
pub fn prune_cache_at<V: Clone>(cache: &CacheMap<V>, ttl_ms: i64, now_ms: i64) -> CacheMap<V> {
    cache
        .iter()
        .filter(|(_, entry)| {
            now_ms
                .checked_sub(entry.ts)
                .is_some_and(|age| age < ttl_ms)
        })
        .map(|(key, entry)| (key.clone(), entry.clone()))
        .collect()
}

pub fn prune_cache<V: Clone>(cache: &CacheMap<V>, ttl_ms: i64) -> CacheMap<V> {
    prune_cache_at(cache, ttl_ms, Utc::now().timestamp_millis())
}

/// On-disk cache of final routing results
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteCache {
    entries: CacheMap<Vec<RuleMatch>>,
}

impl RouteCache {
    /// Load from disk; a missing or corrupt file yields an empty cache
    pub fn load(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "Ignoring corrupt cache file");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let persist_err = |message: String| DispatchError::Persist {
            what: "cache",
            path: path.to_path_buf(),
            message,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
        }
        let payload = serde_json::to_string(self).map_err(|e| persist_err(e.to_string()))?;
        fs::write(path, payload).map_err(|e| persist_err(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries at or beyond `ttl_ms`
    pub fn prune(&mut self, ttl_ms: i64, now_ms: i64) {
        self.entries = prune_cache_at(&self.entries, ttl_ms, now_ms);
    }

    pub fn get(&self, key: &str) -> Option<&Vec<RuleMatch>> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn insert(&mut self, key: String, value: Vec<RuleMatch>, now_ms: i64) {
        self.entries.insert(key, CacheEntry { ts: now_ms, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: i64) -> CacheEntry<u32> {
        CacheEntry { ts, value: 0 }
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("deploy the release", "/project");
        assert_eq!(a, fingerprint("deploy the release", "/project"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, fingerprint("deploy the release", "/other"));
    }

    #[test]
    fn test_fingerprint_uses_prompt_prefix_only() {
        let base = "x".repeat(FINGERPRINT_PROMPT_CHARS);
        let a = fingerprint(&format!("{}tail one", base), "/p");
        let b = fingerprint(&format!("{}tail two", base), "/p");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prune_boundary() {
        let cache: CacheMap<u32> = HashMap::from([
            ("fresh".to_string(), entry(1_000)),
            ("edge".to_string(), entry(500)),
            ("old".to_string(), entry(0)),
        ]);
        let pruned = prune_cache_at(&cache, 500, 1_000);
        assert!(pruned.contains_key("fresh"));
        assert!(!pruned.contains_key("edge"));
        assert!(!pruned.contains_key("old"));
        // input untouched
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_prune_drops_overflowing_timestamps() {
        let cache: CacheMap<u32> = HashMap::from([
            ("min".to_string(), entry(i64::MIN)),
            ("max".to_string(), entry(i64::MAX)),
            ("fresh".to_string(), entry(1_000)),
        ]);
        let pruned = prune_cache_at(&cache, 500, 1_000);
        assert!(!pruned.contains_key("min"));
        assert!(pruned.contains_key("fresh"));

        let pruned = prune_cache_at(&cache, 500, -1_000);
        assert!(!pruned.contains_key("max"));
    }

    #[test]
    fn test_route_cache_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("dispatch-cache.json");
        assert!(RouteCache::load(&path).is_empty());

        let mut cache = RouteCache::default();
        cache.insert("k".to_string(), Vec::new(), 100);
        cache.save(&path).unwrap();

        let mut loaded = RouteCache::load(&path);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("k").is_some());

        loaded.prune(50, 200);
        assert!(loaded.is_empty());
    }
}
