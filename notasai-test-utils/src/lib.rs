//! Notas AI Test Utilities
//!
//! Shared test infrastructure for the template cache:
//! - An in-memory template backend
//! - Proptest generators for templates and cache operations
//! - Fixtures for common scenarios
//! - Cache-specific assertions

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

// Re-export the types tests reach for most
pub use notasai_cache::{
    CacheContainer, CacheEntry, KeyValueStore, ManualClock, MemoryStore, TemplateCacheService,
    TemplateRepository, UnavailableStore,
};
pub use notasai_core::{
    CacheConfig, CacheError, NotasError, NotasResult, RepositoryError, Template,
};

/// User id the fixtures sign in as.
pub const TEST_USER: &str = "user-1";

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Template backend held in memory, counting list calls.
///
/// Can be switched into a failing mode where every call returns
/// `RepositoryError::Backend`.
#[derive(Debug, Default)]
pub struct InMemoryTemplateRepository {
    templates: Mutex<Vec<Template>>,
    list_calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: Vec<Template>) -> Self {
        Self {
            templates: Mutex::new(templates),
            ..Self::default()
        }
    }

    /// Number of `list_templates` calls so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.templates.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> NotasResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend {
                reason: "backend offline".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn lock(&self) -> NotasResult<std::sync::MutexGuard<'_, Vec<Template>>> {
        self.templates.lock().map_err(|_| {
            RepositoryError::Backend {
                reason: "lock poisoned".to_string(),
            }
            .into()
        })
    }
}

impl TemplateRepository for InMemoryTemplateRepository {
    fn list_templates(&self, user_id: &str) -> NotasResult<Vec<Template>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .lock()?
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    fn create_template(&self, template: &Template) -> NotasResult<Template> {
        self.check()?;
        self.lock()?.push(template.clone());
        Ok(template.clone())
    }

    fn update_template(&self, template: &Template) -> NotasResult<Template> {
        self.check()?;
        let mut templates = self.lock()?;
        let slot = templates
            .iter_mut()
            .find(|t| t.id == template.id)
            .ok_or_else(|| RepositoryError::NotFound {
                id: template.id.clone(),
            })?;
        *slot = template.clone();
        Ok(template.clone())
    }

    fn delete_template(&self, template_id: &str) -> NotasResult<()> {
        self.check()?;
        let mut templates = self.lock()?;
        let before = templates.len();
        templates.retain(|t| t.id != template_id);
        if templates.len() == before {
            return Err(RepositoryError::NotFound {
                id: template_id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for templates and cache operations.

    use super::*;
    use proptest::prelude::*;

    /// A valid template name.
    pub fn arb_template_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,40}"
    }

    /// A template body.
    pub fn arb_template_content() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 .:\n]{0,200}"
    }

    /// A creation instant within about four months of the fixture epoch.
    pub fn arb_created_at() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..10_000_000_000).prop_map(|offset| fixtures::epoch() + Duration::milliseconds(offset))
    }

    /// A single valid template owned by [`TEST_USER`].
    pub fn arb_template() -> impl Strategy<Value = Template> {
        (arb_template_name(), arb_template_content(), arb_created_at()).prop_map(
            |(name, content, created_at)| {
                Template::new(Uuid::now_v7().to_string(), name, content, created_at, TEST_USER)
            },
        )
    }

    /// Up to `max` templates with distinct ids `t-0`, `t-1`, ...
    pub fn arb_templates(max: usize) -> impl Strategy<Value = Vec<Template>> {
        prop::collection::vec((arb_template_name(), arb_created_at()), 0..=max).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (name, created_at))| {
                    Template::new(format!("t-{i}"), name, "body", created_at, TEST_USER)
                })
                .collect()
        })
    }

    /// One mutation of the cache, addressing ids `t-0..t-<id_space>`.
    #[derive(Debug, Clone)]
    pub enum CacheOp {
        Add(usize),
        Update(usize),
        Remove(usize),
        Access(usize),
        SetAll(usize),
        ResetCounters,
        Advance(i64),
    }

    pub fn arb_cache_op(id_space: usize) -> impl Strategy<Value = CacheOp> {
        prop_oneof![
            4 => (0..id_space).prop_map(CacheOp::Add),
            2 => (0..id_space).prop_map(CacheOp::Update),
            1 => (0..id_space).prop_map(CacheOp::Remove),
            3 => (0..id_space).prop_map(CacheOp::Access),
            1 => (0..id_space).prop_map(CacheOp::SetAll),
            1 => Just(CacheOp::ResetCounters),
            2 => (1i64..120).prop_map(CacheOp::Advance),
        ]
    }

    /// Apply `op` to `cache`, advancing `clock` for [`CacheOp::Advance`].
    pub fn apply_op(
        cache: &TemplateCacheService<MemoryStore>,
        clock: &ManualClock,
        op: &CacheOp,
    ) {
        match op {
            CacheOp::Add(i) => cache.add_template(&fixtures::numbered_template(*i)),
            CacheOp::Update(i) => cache.update_template(&fixtures::numbered_template(*i)),
            CacheOp::Remove(i) => cache.remove_template(&format!("t-{i}")),
            CacheOp::Access(i) => cache.record_template_access(&format!("t-{i}")),
            CacheOp::SetAll(n) => cache.set_templates(&fixtures::numbered_templates(*n + 1)),
            CacheOp::ResetCounters => cache.reset_access_counters(),
            CacheOp::Advance(secs) => clock.advance(Duration::seconds(*secs)),
        }
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common cache scenarios.

    use super::*;

    /// Fixed starting instant for manual clocks and creation times.
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// A template with a fresh UUIDv7 id.
    pub fn template(name: &str) -> Template {
        Template::new(
            Uuid::now_v7().to_string(),
            name,
            format!("{name}\n\nMotivo de consulta:\nExamen físico:\nPlan:"),
            epoch(),
            TEST_USER,
        )
    }

    /// A template with a given id and creation time.
    pub fn template_created_at(id: &str, created_at: DateTime<Utc>) -> Template {
        Template::new(id, format!("Template {id}"), "body", created_at, TEST_USER)
    }

    /// Template `t-<i>`, created `i` minutes after the epoch.
    pub fn numbered_template(i: usize) -> Template {
        template_created_at(&format!("t-{i}"), epoch() + Duration::minutes(i as i64))
    }

    /// Templates `t-0..t-<n>`.
    pub fn numbered_templates(n: usize) -> Vec<Template> {
        (0..n).map(numbered_template).collect()
    }

    /// A manual clock starting at [`epoch`].
    pub fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(epoch()))
    }

    /// A default-config service over a fresh memory store, signed in as
    /// [`TEST_USER`].
    pub fn cache_service() -> (Arc<MemoryStore>, Arc<ManualClock>, TemplateCacheService<MemoryStore>) {
        cache_service_with_config(CacheConfig::default())
    }

    /// Like [`cache_service`] with a custom config.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    pub fn cache_service_with_config(
        config: CacheConfig,
    ) -> (Arc<MemoryStore>, Arc<ManualClock>, TemplateCacheService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = clock();
        let cache = service_over(store.clone(), clock.clone(), config);
        (store, clock, cache)
    }

    /// A service over an existing store, signed in as [`TEST_USER`].
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    pub fn service_over(
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        config: CacheConfig,
    ) -> TemplateCacheService<MemoryStore> {
        let mut cache: TemplateCacheService<MemoryStore> =
            TemplateCacheService::with_clock(store, config, clock)
            .expect("fixture config must be valid");
        cache.set_user(TEST_USER);
        cache
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over cache state.

    use super::*;

    /// Assert the stored container holds at most `max_size` entries.
    #[track_caller]
    pub fn assert_within_limit(cache: &TemplateCacheService<MemoryStore>) {
        let container = cache.inspect().expect("container should decode");
        assert!(
            container.len() <= cache.config().max_size,
            "cache holds {} entries, limit is {}",
            container.len(),
            cache.config().max_size
        );
    }

    /// Assert templates are ordered newest creation time first.
    #[track_caller]
    pub fn assert_newest_first(templates: &[Template]) {
        for pair in templates.windows(2) {
            assert!(
                pair[0].created_at >= pair[1].created_at,
                "{} ({}) listed before newer {} ({})",
                pair[0].id,
                pair[0].created_at,
                pair[1].id,
                pair[1].created_at
            );
        }
    }

    /// Assert neither key of the current namespace is stored.
    #[track_caller]
    pub fn assert_namespace_empty(store: &MemoryStore, cache: &TemplateCacheService<MemoryStore>) {
        assert_eq!(store.get(cache.storage_key()), Ok(None), "container key still stored");
        assert_eq!(store.get(cache.usage_key()), Ok(None), "usage key still stored");
    }

    /// Assert the access count of `template_id`.
    #[track_caller]
    pub fn assert_access_count(
        cache: &TemplateCacheService<MemoryStore>,
        template_id: &str,
        expected: u32,
    ) {
        let container = cache.inspect().expect("container should decode");
        let entry = container
            .data
            .get(template_id)
            .unwrap_or_else(|| panic!("{template_id} is not cached"));
        assert_eq!(entry.access_count, expected, "access count of {template_id}");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_templates_are_valid() {
        assert!(fixtures::template("Nota SOAP").validate().is_ok());
        assert!(fixtures::numbered_template(3).validate().is_ok());
    }

    #[test]
    fn test_numbered_templates_are_distinct() {
        let templates = fixtures::numbered_templates(4);
        let ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t-0", "t-1", "t-2", "t-3"]);
        assert!(templates[3].created_at > templates[0].created_at);
    }

    #[test]
    fn test_cache_service_fixture_is_scoped() {
        let (_, _, cache) = fixtures::cache_service();
        assert_eq!(cache.user_id(), Some(TEST_USER));
        assert!(cache.is_available());
    }

    #[test]
    fn test_repository_roundtrip() {
        let repo = InMemoryTemplateRepository::new();
        let template = fixtures::template("Ingreso");

        repo.create_template(&template).unwrap();
        assert_eq!(repo.list_templates(TEST_USER).unwrap(), vec![template.clone()]);
        assert_eq!(repo.list_calls(), 1);

        repo.delete_template(&template.id).unwrap();
        assert!(repo.is_empty());
        assert!(matches!(
            repo.delete_template(&template.id),
            Err(NotasError::Repository(RepositoryError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_repository_failing_mode() {
        let repo = InMemoryTemplateRepository::new();
        repo.set_failing(true);
        assert!(matches!(
            repo.list_templates(TEST_USER),
            Err(NotasError::Repository(RepositoryError::Backend { .. }))
        ));
    }
}
