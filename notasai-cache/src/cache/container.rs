//! Persisted cache format.
//!
//! # Wire Format
//!
//! The container key holds one JSON document:
//!
//! ```text
//! { "version": 2,
//!   "data": { "<templateId>": { "data": {..}, "timestamp": <ms>,
//!             "accessCount": 0, "lastAccessed": <ms>, "version": 2 } },
//!   "lastUpdated": <ms> }
//! ```
//!
//! All instants are epoch milliseconds. Entry order in `data` is preserved
//! across a decode/encode cycle; LRU ties fall back to it.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use notasai_core::{CacheError, CacheResult, CacheableTemplate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::freshness::is_within_max_age;

/// One cached template plus its usage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The template payload.
    pub data: T,
    /// Last write of this entry. Drives the age filter.
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Explicit access events recorded for this entry.
    pub access_count: u32,
    /// Last recorded access. Drives LRU ranking.
    #[serde(with = "ts_milliseconds")]
    pub last_accessed: DateTime<Utc>,
    /// Schema version the entry was written under.
    pub version: u32,
}

impl<T> CacheEntry<T> {
    /// A brand-new entry with no recorded accesses.
    pub fn new(data: T, now: DateTime<Utc>, version: u32) -> Self {
        Self {
            data,
            timestamp: now,
            access_count: 0,
            last_accessed: now,
            version,
        }
    }

    /// Record one access event.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now;
    }

    /// Whether the entry was written within `max_age` of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        is_within_max_age(self.timestamp, now, max_age)
    }
}

/// The versioned bundle of entries stored under one namespaced key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheContainer<T> {
    pub version: u32,
    #[serde(default = "IndexMap::new")]
    pub data: IndexMap<String, CacheEntry<T>>,
    #[serde(with = "ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl<T: CacheableTemplate> CacheContainer<T> {
    pub fn new(
        version: u32,
        data: IndexMap<String, CacheEntry<T>>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            version,
            data,
            last_updated,
        }
    }

    /// An empty container, as seen when nothing is stored yet.
    pub fn empty(version: u32) -> Self {
        Self::new(version, IndexMap::new(), DateTime::UNIX_EPOCH)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode a stored container, enforcing the expected schema version.
    ///
    /// The version is checked before the entries are decoded, so a container
    /// from an older schema reports `VersionMismatch` even when its entry
    /// shape no longer matches.
    pub fn decode(key: &str, raw: &str, expected_version: u32) -> CacheResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let found = stored_version(&value);
        if found != Some(expected_version) {
            return Err(CacheError::VersionMismatch {
                key: key.to_string(),
                found,
                expected: expected_version,
            });
        }

        serde_json::from_value(value).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn encode(&self) -> CacheResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Read the top-level `version` field of a stored JSON document.
///
/// Returns `None` when the field is absent, not a non-negative integer,
/// or out of range.
pub fn stored_version(value: &Value) -> Option<u32> {
    value
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// One element of the usage snapshot written next to the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub template_id: String,
    pub access_count: u32,
    #[serde(with = "ts_milliseconds")]
    pub last_accessed: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn from_entry<T: CacheableTemplate>(id: &str, entry: &CacheEntry<T>) -> Self {
        Self {
            template_id: id.to_string(),
            access_count: entry.access_count,
            last_accessed: entry.last_accessed,
            created_at: entry.data.created_at(),
        }
    }
}
