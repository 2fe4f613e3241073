//! Age checks for cache entries and the cache-or-backend read wrapper.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How long ago `written_at` was, as seen from `now`.
///
/// Timestamps in the future count as zero age.
pub fn entry_age(written_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(written_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Whether an entry written at `written_at` is still within `max_age`.
///
/// The bound is exclusive: an entry exactly `max_age` old is expired.
pub fn is_within_max_age(written_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    entry_age(written_at, now) < max_age
}

/// Result of a read through the cache, recording where the value came from.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the cache.
    pub fn from_cache(value: T) -> Self {
        Self {
            value,
            was_cache_hit: true,
        }
    }

    /// A value fetched from the template backend (cache miss).
    pub fn from_backend(value: T) -> Self {
        Self {
            value,
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_entry_age() {
        assert_eq!(entry_age(at(1_000), at(6_000)), Duration::from_secs(5));
    }

    #[test]
    fn test_entry_age_future_is_zero() {
        assert_eq!(entry_age(at(6_000), at(1_000)), Duration::ZERO);
    }

    #[test]
    fn test_max_age_bound_is_exclusive() {
        let max_age = Duration::from_secs(60);
        assert!(is_within_max_age(at(0), at(59_999), max_age));
        assert!(!is_within_max_age(at(0), at(60_000), max_age));
    }

    #[test]
    fn test_cache_read_from_cache() {
        let read = CacheRead::from_cache("value");
        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert_eq!(*read.value(), "value");
    }

    #[test]
    fn test_cache_read_from_backend_map() {
        let read = CacheRead::from_backend(42i32);
        assert!(read.was_cache_miss());

        let mapped = read.map(|v| v.to_string());
        assert!(mapped.was_cache_miss());
        assert_eq!(mapped.into_value(), "42");
    }
}
