//! Least-recently-used size limit.

use indexmap::IndexMap;

use super::container::CacheEntry;

/// Trim `entries` to at most `max_size`, evicting the least recently
/// accessed first.
///
/// Survivors are reordered most-recent first. The sort is stable, so among
/// entries with equal `last_accessed` the earlier-inserted one survives.
/// Returns the ids of evicted entries.
pub fn apply_lru_limit<T>(
    entries: &mut IndexMap<String, CacheEntry<T>>,
    max_size: usize,
) -> Vec<String> {
    if entries.len() <= max_size {
        return Vec::new();
    }

    entries.sort_by(|_, a, _, b| b.last_accessed.cmp(&a.last_accessed));
    let evicted = entries.split_off(max_size);
    evicted.into_keys().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn entries(accessed: &[(&str, i64)]) -> IndexMap<String, CacheEntry<()>> {
        accessed
            .iter()
            .map(|(id, ms)| {
                let mut entry = CacheEntry::new((), at(0), 2);
                entry.last_accessed = at(*ms);
                (id.to_string(), entry)
            })
            .collect()
    }

    #[test]
    fn test_under_limit_is_untouched() {
        let mut map = entries(&[("a", 3), ("b", 1)]);
        let evicted = apply_lru_limit(&mut map, 2);

        assert!(evicted.is_empty());
        let ids: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let mut map = entries(&[("a", 30), ("b", 10), ("c", 20), ("d", 40)]);
        let evicted = apply_lru_limit(&mut map, 2);

        assert_eq!(map.len(), 2);
        assert!(map.contains_key("d"));
        assert!(map.contains_key("a"));
        let mut evicted = evicted;
        evicted.sort();
        assert_eq!(evicted, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut map = entries(&[("first", 5), ("second", 5), ("third", 5)]);
        let evicted = apply_lru_limit(&mut map, 2);

        assert_eq!(evicted, vec!["third".to_string()]);
        let ids: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
