//! Notas AI Cache - Template Cache over a Key-Value Store
//!
//! Client-side accelerator in front of the template persistence backend.
//! The backend stays the source of truth; this crate only keeps a versioned,
//! size-bounded, per-user copy of the template list in a key-value store.

pub mod cache;
pub mod clock;
pub mod store;

pub use cache::{
    CacheContainer, CacheEntry, CacheRead, CacheStatsSummary, CachedTemplateRepository,
    CleanupReport, MostUsedTemplate, TemplateCacheService, TemplateCacheStats,
    TemplateRepository, UsageRecord, UserScopedKey, DEFAULT_MOST_USED_LIMIT,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{KeyValueStore, LmdbStore, LmdbStoreError, MemoryStore, UnavailableStore};
