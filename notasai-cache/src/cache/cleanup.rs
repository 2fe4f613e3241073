//! Cold-start sweep of outdated and corrupt cache keys.
//!
//! Schema migrations happen here, by deletion: every key under the cache or
//! usage namespaces (of every user, not just the current one) whose JSON
//! value lacks a `version` at least as new as the configured one is removed.

use std::fmt;

use notasai_core::CacheResult;
use tracing::{debug, info};

use super::container::stored_version;
use crate::store::KeyValueStore;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Keys found under the swept prefixes.
    pub scanned: usize,
    /// Keys removed for a missing or older version.
    pub removed_outdated: usize,
    /// Keys removed because their value was not JSON.
    pub removed_corrupt: usize,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.removed_outdated + self.removed_corrupt
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {} keys, removed {} outdated and {} corrupt",
            self.scanned, self.removed_outdated, self.removed_corrupt
        )
    }
}

/// Sweep every key under `prefixes`, keeping only values whose `version`
/// is at least `current_version`. Empty values are left alone.
pub fn sweep_namespaces<S: KeyValueStore + ?Sized>(
    store: &S,
    prefixes: &[String],
    current_version: u32,
) -> CacheResult<CleanupReport> {
    let mut report = CleanupReport::default();

    for prefix in prefixes {
        for key in store.keys_with_prefix(prefix)? {
            report.scanned += 1;

            let Some(raw) = store.get(&key)? else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }

            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => {
                    let outdated = match stored_version(&value) {
                        Some(version) => version == 0 || version < current_version,
                        None => true,
                    };
                    if outdated {
                        store.remove(&key)?;
                        report.removed_outdated += 1;
                        debug!(key = %key, "removed outdated template cache key");
                    }
                }
                Err(_) => {
                    store.remove(&key)?;
                    report.removed_corrupt += 1;
                    debug!(key = %key, "removed corrupt template cache key");
                }
            }
        }
    }

    if report.removed() > 0 {
        info!(
            scanned = report.scanned,
            removed_outdated = report.removed_outdated,
            removed_corrupt = report.removed_corrupt,
            "template cache cleanup finished"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn prefixes() -> Vec<String> {
        vec![
            "notasai_template_cache_".to_string(),
            "notasai_template_usage_".to_string(),
        ]
    }

    #[test]
    fn test_sweep_removes_old_and_corrupt() {
        let store = MemoryStore::new();
        store.set("notasai_template_cache_a", r#"{"version":1,"data":{}}"#).unwrap();
        store.set("notasai_template_cache_b", r#"{"version":2,"data":{}}"#).unwrap();
        store.set("notasai_template_cache_c", "{{{").unwrap();
        store.set("notasai_template_usage_a", "[]").unwrap();
        store.set("notasai_template_cache_d", r#"{"version":3}"#).unwrap();

        let report = sweep_namespaces(&store, &prefixes(), 2).unwrap();

        assert_eq!(report.scanned, 5);
        assert_eq!(report.removed_outdated, 2);
        assert_eq!(report.removed_corrupt, 1);
        assert!(store.get("notasai_template_cache_a").unwrap().is_none());
        assert!(store.get("notasai_template_cache_c").unwrap().is_none());
        assert!(store.get("notasai_template_usage_a").unwrap().is_none());
        assert!(store.get("notasai_template_cache_b").unwrap().is_some());
        assert!(store.get("notasai_template_cache_d").unwrap().is_some());
    }

    #[test]
    fn test_report_display() {
        let report = CleanupReport {
            scanned: 4,
            removed_outdated: 2,
            removed_corrupt: 1,
        };
        assert_eq!(report.removed(), 3);
        assert_eq!(
            report.to_string(),
            "scanned 4 keys, removed 2 outdated and 1 corrupt"
        );
    }

    #[test]
    fn test_sweep_ignores_unrelated_keys() {
        let store = MemoryStore::new();
        store.set("notasai_theme", "dark").unwrap();
        store.set("notasai_template_cache", "{{{").unwrap();

        let report = sweep_namespaces(&store, &prefixes(), 2).unwrap();

        assert_eq!(report, CleanupReport::default());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_sweep_skips_empty_values() {
        let store = MemoryStore::new();
        store.set("notasai_template_cache_a", "").unwrap();

        let report = sweep_namespaces(&store, &prefixes(), 2).unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.removed(), 0);
    }

    #[test]
    fn test_sweep_treats_version_zero_as_missing() {
        let store = MemoryStore::new();
        store.set("notasai_template_cache_a", r#"{"version":0}"#).unwrap();

        let report = sweep_namespaces(&store, &prefixes(), 1).unwrap();
        assert_eq!(report.removed_outdated, 1);
    }
}
