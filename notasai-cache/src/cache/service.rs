//! The template cache service.

use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use notasai_core::{CacheConfig, CacheError, CacheResult, CacheableTemplate, ConfigError, Template};
use tracing::{debug, info, warn};

use super::cleanup::{sweep_namespaces, CleanupReport};
use super::container::{CacheContainer, CacheEntry, UsageRecord};
use super::lru::apply_lru_limit;
use super::namespace::UserScopedKey;
use super::stats::{CacheStatsSummary, TemplateCacheStats};
use crate::clock::{Clock, SystemClock};
use crate::store::KeyValueStore;

/// Default number of templates returned by the most-used query.
pub const DEFAULT_MOST_USED_LIMIT: usize = 5;

/// Versioned, size-bounded LRU cache of one user's templates.
///
/// Holds one container key and one usage key, both re-derived by
/// [`set_user`](Self::set_user). Every public operation is infallible: store
/// failures, corrupt values and version mismatches degrade to `None`, an empty
/// list, `false` or a no-op. [`inspect`](Self::inspect) exposes the typed
/// error path without side effects.
///
/// If the store reports itself unavailable at construction, every operation
/// is a no-op for the lifetime of the service.
pub struct TemplateCacheService<S: KeyValueStore + ?Sized, T: CacheableTemplate = Template> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    container_key: UserScopedKey,
    usage_key: UserScopedKey,
    available: bool,
    last_cleanup: Option<CleanupReport>,
    _template: PhantomData<fn() -> T>,
}

impl<S: KeyValueStore + ?Sized, T: CacheableTemplate> TemplateCacheService<S, T> {
    /// Create a service with the default configuration and the system clock.
    pub fn new(store: Arc<S>) -> Self {
        Self::build(store, CacheConfig::default(), Arc::new(SystemClock))
    }

    /// Create a service with a custom configuration.
    pub fn with_config(store: Arc<S>, config: CacheConfig) -> Result<Self, ConfigError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a service with a custom configuration and time source.
    pub fn with_clock(
        store: Arc<S>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(store, config, clock))
    }

    fn build(store: Arc<S>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let available = store.is_available();
        let mut service = Self {
            container_key: UserScopedKey::unscoped(&config.storage_key),
            usage_key: UserScopedKey::unscoped(&config.usage_key),
            store,
            clock,
            config,
            available,
            last_cleanup: None,
            _template: PhantomData,
        };

        if available {
            service.last_cleanup = Some(service.sweep_stale_namespaces());
        } else {
            debug!("template cache store unavailable, cache disabled");
        }
        service
    }

    // ========================================================================
    // NAMESPACE
    // ========================================================================

    /// Scope both keys to `user_id`. An empty id behaves like
    /// [`clear_user`](Self::clear_user).
    pub fn set_user(&mut self, user_id: &str) {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            self.clear_user();
            return;
        }
        self.container_key = UserScopedKey::for_user(&self.config.storage_key, user_id);
        self.usage_key = UserScopedKey::for_user(&self.config.usage_key, user_id);
        debug!(user_id, key = %self.container_key, "template cache scoped to user");
    }

    /// Return to the unscoped base keys.
    pub fn clear_user(&mut self) {
        self.container_key = UserScopedKey::unscoped(&self.config.storage_key);
        self.usage_key = UserScopedKey::unscoped(&self.config.usage_key);
    }

    pub fn user_id(&self) -> Option<&str> {
        self.container_key.user_id()
    }

    /// Current container key.
    pub fn storage_key(&self) -> &str {
        self.container_key.as_str()
    }

    /// Current usage snapshot key.
    pub fn usage_key(&self) -> &str {
        self.usage_key.as_str()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether the store was usable at construction.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Report of the sweep run at construction, if it ran.
    pub fn cleanup_report(&self) -> Option<CleanupReport> {
        self.last_cleanup
    }

    /// Statistics accessor borrowing this service.
    pub fn stats(&self) -> TemplateCacheStats<'_, S, T> {
        TemplateCacheStats::new(self)
    }

    // ========================================================================
    // PUBLIC OPERATIONS
    // ========================================================================

    /// Fresh cached templates, newest creation time first.
    ///
    /// Returns `None` on a miss. A corrupt or version-mismatched container,
    /// or one with no fresh entries, is cleared as a side effect. Access
    /// counters are never touched.
    pub fn get_templates(&self) -> Option<Vec<T>> {
        degrade("get_templates", self.get_templates_inner(), None)
    }

    /// Count one access to `template_id`. No-op if it is not cached.
    pub fn record_template_access(&self, template_id: &str) {
        degrade(
            "record_template_access",
            self.record_template_access_inner(template_id),
            (),
        )
    }

    /// Replace the cached set with `templates`.
    ///
    /// Usage metadata of ids that were already cached is carried over. Also
    /// writes the usage snapshot.
    pub fn set_templates(&self, templates: &[T]) {
        degrade("set_templates", self.set_templates_inner(templates), ())
    }

    /// Insert or overwrite one template with fresh usage counters.
    pub fn add_template(&self, template: &T) {
        degrade("add_template", self.add_template_inner(template), ())
    }

    /// Replace the payload of a cached template, or add it if absent.
    pub fn update_template(&self, template: &T) {
        degrade("update_template", self.update_template_inner(template), ())
    }

    /// Drop one template. No-op if it is not cached.
    pub fn remove_template(&self, template_id: &str) {
        degrade(
            "remove_template",
            self.remove_template_inner(template_id),
            (),
        )
    }

    /// Whether a current-version container with at least one entry exists.
    ///
    /// Entry age is not checked.
    pub fn is_cache_valid(&self) -> bool {
        degrade(
            "is_cache_valid",
            self.load().map(|c| c.is_some_and(|c| !c.is_empty())),
            false,
        )
    }

    /// Up to `limit` fresh templates with at least one recorded access,
    /// most accessed first.
    pub fn get_most_used_templates(&self, limit: usize) -> Vec<T> {
        degrade(
            "get_most_used_templates",
            self.get_most_used_templates_inner(limit),
            Vec::new(),
        )
    }

    /// Summary of everything stored, expired entries included.
    pub fn get_cache_stats(&self) -> CacheStatsSummary {
        degrade(
            "get_cache_stats",
            self.get_cache_stats_inner(),
            CacheStatsSummary::default(),
        )
    }

    /// Zero every access counter and set every `last_accessed` to now.
    pub fn reset_access_counters(&self) {
        degrade(
            "reset_access_counters",
            self.reset_access_counters_inner(),
            (),
        )
    }

    /// Drop the cache so the next read goes to the backend.
    pub fn invalidate(&self) {
        self.clear();
    }

    /// Remove the container and the usage snapshot of the current namespace.
    pub fn clear(&self) {
        degrade("clear", self.clear_inner(), ())
    }

    /// The stored container, decoded strictly and without side effects.
    ///
    /// An absent container reads as empty.
    pub fn inspect(&self) -> CacheResult<CacheContainer<T>> {
        Ok(self
            .load()?
            .unwrap_or_else(|| CacheContainer::empty(self.config.version)))
    }

    /// Delete outdated and corrupt keys of every user under both namespaces.
    pub fn sweep_stale_namespaces(&self) -> CleanupReport {
        let result = self.ensure_available().and_then(|()| {
            let prefixes = [
                UserScopedKey::namespace_prefix(&self.config.storage_key),
                UserScopedKey::namespace_prefix(&self.config.usage_key),
            ];
            sweep_namespaces(self.store.as_ref(), &prefixes, self.config.version)
        });
        degrade("sweep_stale_namespaces", result, CleanupReport::default())
    }

    // ========================================================================
    // FALLIBLE INTERNALS
    // ========================================================================

    fn get_templates_inner(&self) -> CacheResult<Option<Vec<T>>> {
        Ok(self
            .fresh_entries()?
            .map(|entries| entries.into_iter().map(|entry| entry.data).collect()))
    }

    fn record_template_access_inner(&self, template_id: &str) -> CacheResult<()> {
        let mut container = self.load_for_write()?;
        let Some(entry) = container.data.get_mut(template_id) else {
            return Ok(());
        };

        entry.record_access(self.clock.now());
        debug!(
            template_id,
            name = entry.data.display_name(),
            access_count = entry.access_count,
            "recorded template access"
        );
        self.persist(container)
    }

    fn set_templates_inner(&self, templates: &[T]) -> CacheResult<()> {
        let previous = self.load_for_write()?;
        let now = self.clock.now();
        let version = self.config.version;

        let mut data: IndexMap<String, CacheEntry<T>> = IndexMap::with_capacity(templates.len());
        for template in templates {
            let id = template.template_id().to_string();
            let mut entry = CacheEntry::new(template.clone(), now, version);
            if let Some(prev) = previous.data.get(&id) {
                entry.access_count = prev.access_count;
                entry.last_accessed = prev.last_accessed;
            }
            data.insert(id, entry);
        }

        self.enforce_limit(&mut data);
        self.write_usage_snapshot(&data)?;

        let count = data.len();
        self.persist(CacheContainer::new(version, data, now))?;
        debug!(key = %self.container_key, count, "template cache replaced");
        Ok(())
    }

    fn add_template_inner(&self, template: &T) -> CacheResult<()> {
        let mut container = self.load_for_write()?;
        let now = self.clock.now();
        let id = template.template_id().to_string();

        // Overwrites start from zero usage; `update_template` keeps it.
        let entry = CacheEntry::new(template.clone(), now, self.config.version);
        container.data.insert(id, entry);

        debug!(name = template.display_name(), "template added to cache");
        self.persist(container)
    }

    fn update_template_inner(&self, template: &T) -> CacheResult<()> {
        let mut container = self.load_for_write()?;
        let Some(entry) = container.data.get_mut(template.template_id()) else {
            return self.add_template_inner(template);
        };

        entry.data = template.clone();
        entry.timestamp = self.clock.now();
        debug!(name = template.display_name(), "template updated in cache");
        self.persist(container)
    }

    fn remove_template_inner(&self, template_id: &str) -> CacheResult<()> {
        let mut container = self.load_for_write()?;
        if container.data.shift_remove(template_id).is_none() {
            return Ok(());
        }

        debug!(template_id, "template removed from cache");
        self.persist(container)
    }

    fn get_most_used_templates_inner(&self, limit: usize) -> CacheResult<Vec<T>> {
        let Some(entries) = self.fresh_entries()? else {
            return Ok(Vec::new());
        };

        let mut used: Vec<CacheEntry<T>> = entries
            .into_iter()
            .filter(|entry| entry.access_count > 0)
            .collect();
        used.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        used.truncate(limit);
        Ok(used.into_iter().map(|entry| entry.data).collect())
    }

    fn get_cache_stats_inner(&self) -> CacheResult<CacheStatsSummary> {
        let Some(raw) = self.read_raw()? else {
            return Ok(CacheStatsSummary::default());
        };
        let container =
            CacheContainer::<T>::decode(self.container_key.as_str(), &raw, self.config.version)?;
        Ok(CacheStatsSummary::from_entries(&container.data, raw.len()))
    }

    fn reset_access_counters_inner(&self) -> CacheResult<()> {
        let mut container = self.load_for_write()?;
        if container.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        for entry in container.data.values_mut() {
            entry.access_count = 0;
            entry.last_accessed = now;
        }
        info!(key = %self.container_key, "template access counters reset");
        self.persist(container)
    }

    fn clear_inner(&self) -> CacheResult<()> {
        self.ensure_available()?;
        self.store.remove(self.container_key.as_str())?;
        self.store.remove(self.usage_key.as_str())?;
        info!(key = %self.container_key, "template cache cleared");
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn ensure_available(&self) -> CacheResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }

    /// Raw container value. Empty strings read as absent.
    fn read_raw(&self) -> CacheResult<Option<String>> {
        self.ensure_available()?;
        Ok(self
            .store
            .get(self.container_key.as_str())?
            .filter(|raw| !raw.is_empty()))
    }

    /// Strict decode of the stored container.
    fn load(&self) -> CacheResult<Option<CacheContainer<T>>> {
        match self.read_raw()? {
            None => Ok(None),
            Some(raw) => {
                CacheContainer::decode(self.container_key.as_str(), &raw, self.config.version)
                    .map(Some)
            }
        }
    }

    /// The container to mutate. Corrupt or mismatched values start over
    /// empty and are overwritten on the next persist.
    fn load_for_write(&self) -> CacheResult<CacheContainer<T>> {
        match self.load() {
            Ok(Some(container)) => Ok(container),
            Ok(None) => Ok(CacheContainer::empty(self.config.version)),
            Err(error @ (CacheError::Corrupt { .. } | CacheError::VersionMismatch { .. })) => {
                debug!(error = %error, "discarding unreadable template cache before write");
                Ok(CacheContainer::empty(self.config.version))
            }
            Err(error) => Err(error),
        }
    }

    /// Fresh entries, newest creation time first.
    ///
    /// Clears the namespace when the container is unreadable or nothing in
    /// it is fresh.
    fn fresh_entries(&self) -> CacheResult<Option<Vec<CacheEntry<T>>>> {
        let container = match self.load() {
            Ok(Some(container)) => container,
            Ok(None) => {
                debug!(key = %self.container_key, "template cache miss");
                return Ok(None);
            }
            Err(error @ (CacheError::Corrupt { .. } | CacheError::VersionMismatch { .. })) => {
                info!(error = %error, "dropping unreadable template cache");
                self.clear_inner()?;
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let now = self.clock.now();
        let max_age = self.config.max_age;
        let mut fresh: Vec<CacheEntry<T>> = container
            .data
            .into_values()
            .filter(|entry| entry.is_fresh(now, max_age))
            .collect();

        if fresh.is_empty() {
            debug!(key = %self.container_key, "template cache expired");
            self.clear_inner()?;
            return Ok(None);
        }

        fresh.sort_by(|a, b| b.data.created_at().cmp(&a.data.created_at()));
        debug!(key = %self.container_key, count = fresh.len(), "template cache hit");
        Ok(Some(fresh))
    }

    fn enforce_limit(&self, data: &mut IndexMap<String, CacheEntry<T>>) {
        let before = data.len();
        let evicted = apply_lru_limit(data, self.config.max_size);
        if !evicted.is_empty() {
            info!(
                key = %self.container_key,
                kept = data.len(),
                total = before,
                "evicted least recently used templates"
            );
        }
    }

    /// Apply the size limit, stamp the container and write it.
    fn persist(&self, mut container: CacheContainer<T>) -> CacheResult<()> {
        self.ensure_available()?;
        self.enforce_limit(&mut container.data);
        container.version = self.config.version;
        container.last_updated = self.clock.now();

        let encoded = container.encode()?;
        self.store.set(self.container_key.as_str(), &encoded)?;
        Ok(())
    }

    fn write_usage_snapshot(&self, data: &IndexMap<String, CacheEntry<T>>) -> CacheResult<()> {
        self.ensure_available()?;
        let records: Vec<UsageRecord> = data
            .iter()
            .map(|(id, entry)| UsageRecord::from_entry(id, entry))
            .collect();
        let encoded = serde_json::to_string(&records)?;
        self.store.set(self.usage_key.as_str(), &encoded)?;
        Ok(())
    }
}

/// Convert a failed operation into its safe default.
///
/// An unavailable store is expected and stays quiet; anything else is logged.
fn degrade<R>(operation: &'static str, result: CacheResult<R>, fallback: R) -> R {
    match result {
        Ok(value) => value,
        Err(CacheError::Unavailable) => fallback,
        Err(error) => {
            warn!(operation, error = %error, "template cache operation degraded");
            fallback
        }
    }
}
