//! Key-value store port and its implementations.
//!
//! The template cache never talks to a concrete storage API. It depends on
//! [`KeyValueStore`], a string-keyed, string-valued store with the same
//! capabilities a browser's persistent storage offers: get, set, remove and
//! key enumeration.

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::{LmdbStore, LmdbStoreError};
pub use memory::{MemoryStore, UnavailableStore};
pub use traits::KeyValueStore;
