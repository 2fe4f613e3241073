//! Key-value store trait.

use notasai_core::StoreError;

/// Persistent string key-value store.
///
/// Implementations must be usable behind a shared reference; every
/// operation is a single synchronous round trip. There is no cross-handle
/// coordination: two writers to the same key race and the last one wins.
pub trait KeyValueStore: Send + Sync {
    /// Whether this store can persist anything at all.
    ///
    /// The cache checks this once at construction and degrades every
    /// operation to a no-op when it is false.
    fn is_available(&self) -> bool {
        true
    }

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Returns true if a value was present.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// List every key in the store.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// List keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}
