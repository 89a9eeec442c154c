//! Per-tenant cache of assembled translation bundles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::sync::Cache;

use livebase_core::TenantId;
use livebase_settings::Bundle;

/// Bundles keyed by `(tenant, locale)`, expiring `ttl` after insertion.
///
/// Writers to a tenant's translations call [`TranslationCache::invalidate`]
/// so readers never see a bundle older than the last committed change.
///
/// Each key carries a generation bumped by every invalidation. A reader
/// takes the generation before loading rows and hands it back to
/// [`TranslationCache::insert_if_current`]; a bundle built across an
/// invalidation is returned to its caller but never cached.
#[derive(Clone)]
pub struct TranslationCache {
    inner: Cache<(TenantId, String), Arc<Bundle>>,
    generations: Arc<Mutex<HashMap<(TenantId, String), u64>>>,
}

/// Snapshot of a key's generation taken before a bundle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

impl TranslationCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn generation(&self, tenant_id: TenantId, locale: &str) -> Generation {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        Generation(
            generations
                .get(&(tenant_id, locale.to_string()))
                .copied()
                .unwrap_or(0),
        )
    }

    pub fn get(&self, tenant_id: TenantId, locale: &str) -> Option<Arc<Bundle>> {
        self.inner.get(&(tenant_id, locale.to_string()))
    }

    /// Cache `bundle` only if no invalidation happened since `seen` was taken.
    pub fn insert_if_current(
        &self,
        tenant_id: TenantId,
        locale: &str,
        seen: Generation,
        bundle: Bundle,
    ) -> Arc<Bundle> {
        let bundle = Arc::new(bundle);
        let key = (tenant_id, locale.to_string());
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        if generations.get(&key).copied().unwrap_or(0) == seen.0 {
            self.inner.insert(key, bundle.clone());
        }
        bundle
    }

    pub fn invalidate(&self, tenant_id: TenantId, locale: &str) {
        let key = (tenant_id, locale.to_string());
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        *generations.entry(key.clone()).or_insert(0) += 1;
        self.inner.invalidate(&key);
    }
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bundle(value: &str) -> Bundle {
        let mut ns = BTreeMap::new();
        ns.insert("save".to_string(), value.to_string());
        let mut bundle = Bundle::new();
        bundle.insert("common".to_string(), ns);
        bundle
    }

    fn fill(cache: &TranslationCache, tenant: TenantId, locale: &str, value: &str) {
        let seen = cache.generation(tenant, locale);
        cache.insert_if_current(tenant, locale, seen, bundle(value));
    }

    #[test]
    fn entries_are_per_tenant_and_locale() {
        let cache = TranslationCache::new(Duration::from_secs(60), 100);
        let (t1, t2) = (TenantId::new(), TenantId::new());
        fill(&cache, t1, "en", "Save");
        fill(&cache, t1, "zh-CN", "保存");

        assert_eq!(cache.get(t1, "en").unwrap()["common"]["save"], "Save");
        assert_eq!(cache.get(t1, "zh-CN").unwrap()["common"]["save"], "保存");
        assert!(cache.get(t2, "en").is_none());
    }

    #[test]
    fn invalidate_drops_only_that_locale() {
        let cache = TranslationCache::new(Duration::from_secs(60), 100);
        let tenant = TenantId::new();
        fill(&cache, tenant, "en", "Save");
        fill(&cache, tenant, "fr", "Enregistrer");

        cache.invalidate(tenant, "en");
        assert!(cache.get(tenant, "en").is_none());
        assert!(cache.get(tenant, "fr").is_some());
    }

    #[test]
    fn bundle_built_across_an_invalidation_is_not_cached() {
        let cache = TranslationCache::new(Duration::from_secs(60), 100);
        let tenant = TenantId::new();

        let seen = cache.generation(tenant, "en");
        // A writer commits and invalidates while the reader is still building.
        cache.invalidate(tenant, "en");
        let served = cache.insert_if_current(tenant, "en", seen, bundle("Old"));
        assert_eq!(served["common"]["save"], "Old");
        assert!(cache.get(tenant, "en").is_none());

        let seen = cache.generation(tenant, "en");
        cache.insert_if_current(tenant, "en", seen, bundle("New"));
        assert_eq!(cache.get(tenant, "en").unwrap()["common"]["save"], "New");
    }

    #[test]
    fn invalidating_one_locale_keeps_other_generations() {
        let cache = TranslationCache::new(Duration::from_secs(60), 100);
        let tenant = TenantId::new();
        let seen = cache.generation(tenant, "fr");
        cache.invalidate(tenant, "en");
        cache.insert_if_current(tenant, "fr", seen, bundle("Enregistrer"));
        assert!(cache.get(tenant, "fr").is_some());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TranslationCache::new(Duration::from_millis(50), 100);
        let tenant = TenantId::new();
        fill(&cache, tenant, "en", "Save");
        assert!(cache.get(tenant, "en").is_some());
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get(tenant, "en").is_none());
    }
}
