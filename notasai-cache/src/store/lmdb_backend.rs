//! Persistent key-value store on LMDB.
//!
//! Each call runs in its own heed transaction: reads and key scans take a
//! read transaction, `set` and `remove` commit a write transaction. Keys and
//! values are UTF-8 strings in the environment's single unnamed database.

use std::path::Path;

use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use notasai_core::StoreError;

use super::traits::KeyValueStore;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// The environment could not be opened or its map size is unusable.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbStoreError {
    fn from(e: heed::Error) -> Self {
        LmdbStoreError::Transaction(e.to_string())
    }
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        StoreError::Backend {
            reason: e.to_string(),
        }
    }
}

/// Size of the memory map for `max_size_mb` megabytes.
fn map_size_bytes(max_size_mb: usize) -> Result<usize, LmdbStoreError> {
    if max_size_mb == 0 {
        return Err(LmdbStoreError::EnvOpen(
            "map size must be at least 1 MB".to_string(),
        ));
    }
    max_size_mb.checked_mul(BYTES_PER_MB).ok_or_else(|| {
        LmdbStoreError::EnvOpen(format!("map size of {max_size_mb} MB overflows usize"))
    })
}

/// Template cache storage in an LMDB directory.
///
/// # Example
///
/// ```ignore
/// use notasai_cache::{LmdbStore, TemplateCacheService};
/// use std::sync::Arc;
///
/// let store = Arc::new(LmdbStore::new("/var/lib/notasai/cache", 64)?);
/// let mut cache = TemplateCacheService::<_, Template>::new(store);
/// cache.set_user("user-1");
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbStore {
    /// Open the store at `path`, creating the directory and database on
    /// first use. The environment maps at most `max_size_mb` megabytes.
    ///
    /// Fails with [`LmdbStoreError::EnvOpen`] when `max_size_mb` is zero or
    /// too large to express in bytes.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let path = path.as_ref();
        let map_size = map_size_bytes(max_size_mb)?;
        std::fs::create_dir_all(path)?;

        // SAFETY: one environment per directory in this process.
        let env = unsafe { EnvOpenOptions::new().map_size(map_size).max_dbs(1).open(path) }
            .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;
        let db = Self::open_database(&env)?;

        Ok(Self { env, db })
    }

    fn open_database(env: &Env) -> Result<Database<Str, Str>, LmdbStoreError> {
        let mut wtxn = env.write_txn()?;
        let db = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit()?;
        Ok(db)
    }

    fn read(&self) -> Result<RoTxn<'_>, LmdbStoreError> {
        Ok(self.env.read_txn()?)
    }
}

impl KeyValueStore for LmdbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let rtxn = self.read()?;
        let value = self
            .db
            .get(&rtxn, key)
            .map_err(LmdbStoreError::from)?
            .map(str::to_owned);
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbStoreError::from)?;
        self.db
            .put(&mut wtxn, key, value)
            .map_err(LmdbStoreError::from)?;
        wtxn.commit().map_err(LmdbStoreError::from)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbStoreError::from)?;
        let deleted = self
            .db
            .delete(&mut wtxn, key)
            .map_err(LmdbStoreError::from)?;
        wtxn.commit().map_err(LmdbStoreError::from)?;
        Ok(deleted)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let rtxn = self.read()?;
        let mut keys = Vec::new();
        for entry in self.db.iter(&rtxn).map_err(LmdbStoreError::from)? {
            let (key, _) = entry.map_err(LmdbStoreError::from)?;
            keys.push(key.to_owned());
        }
        Ok(keys)
    }

    /// Cursor scan over the prefix range instead of every key.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let rtxn = self.read()?;
        let mut keys = Vec::new();
        for entry in self
            .db
            .prefix_iter(&rtxn, prefix)
            .map_err(LmdbStoreError::from)?
        {
            let (key, _) = entry.map_err(LmdbStoreError::from)?;
            keys.push(key.to_owned());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[test]
    fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();

        store.set("notasai_template_cache_u1", "{}").expect("set should succeed");
        let value = store.get("notasai_template_cache_u1").expect("get should succeed");
        assert_eq!(value.as_deref(), Some("{}"));
    }

    #[test]
    fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.get("missing").expect("get should succeed").is_none());
    }

    #[test]
    fn test_overwrite() {
        let (store, _temp_dir) = create_test_store();

        store.set("k", "first").expect("set should succeed");
        store.set("k", "second").expect("set should succeed");
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_remove() {
        let (store, _temp_dir) = create_test_store();

        store.set("k", "v").expect("set should succeed");
        assert!(store.remove("k").expect("remove should succeed"));
        assert!(!store.remove("k").expect("remove should succeed"));
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_keys_with_prefix() {
        let (store, _temp_dir) = create_test_store();

        store.set("notasai_template_cache_a", "1").unwrap();
        store.set("notasai_template_cache_b", "1").unwrap();
        store.set("notasai_template_usage_a", "1").unwrap();

        let mut keys = store.keys_with_prefix("notasai_template_cache_").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["notasai_template_cache_a", "notasai_template_cache_b"]);
        assert_eq!(store.keys().unwrap().len(), 3);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let store = LmdbStore::new(temp_dir.path(), 10).expect("open should succeed");
            store.set("k", "v").expect("set should succeed");
        }
        let store = LmdbStore::new(temp_dir.path(), 10).expect("reopen should succeed");
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_map_size_bounds() {
        assert_eq!(map_size_bytes(10).unwrap(), 10 * 1024 * 1024);
        assert!(matches!(map_size_bytes(0), Err(LmdbStoreError::EnvOpen(_))));
        assert!(matches!(
            map_size_bytes(usize::MAX),
            Err(LmdbStoreError::EnvOpen(ref reason)) if reason.contains("overflows")
        ));
    }

    #[test]
    fn test_oversized_map_is_rejected_before_touching_disk() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let path = temp_dir.path().join("never-created");

        let result = LmdbStore::new(&path, usize::MAX);

        assert!(matches!(result, Err(LmdbStoreError::EnvOpen(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_error_converts_to_store_error() {
        let err = StoreError::from(LmdbStoreError::Transaction("boom".to_string()));
        assert!(matches!(err, StoreError::Backend { ref reason } if reason.contains("boom")));
    }
}
