//! Inspection registry for live stores
//!
//! A [`DevtoolsRegistry`] is an optional side table owned by the host
//! application. Stores created with devtools enabled and a registry in
//! their config add themselves here and remove themselves on destroy.
//! Nothing in the store core reads from it.
//!
//! Entries hold stores weakly, so a registry never keeps a dropped store
//! alive.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use parking_lot::RwLock;
use state_store::Snapshot;
use tracing::{debug, warn};

use crate::store::{Store, StoreInner};

/// Named registry of stores for external inspection tooling
#[derive(Default)]
pub struct DevtoolsRegistry {
    entries: RwLock<BTreeMap<String, Weak<StoreInner>>>,
    next_id: AtomicU64,
}

impl DevtoolsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key a store will be registered under
    ///
    /// The configured name when present, otherwise `store-{n}` from this
    /// registry's counter.
    pub(crate) fn next_key(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => name.to_string(),
            None => format!("store-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        }
    }

    /// Register `store` under `key`, replacing any existing entry
    pub(crate) fn insert(&self, key: String, store: &Store) {
        let mut entries = self.entries.write();
        let replaced = entries
            .insert(key.clone(), store.downgrade())
            .is_some_and(|previous| previous.strong_count() > 0);

        if replaced {
            warn!(key = %key, "Replacing live store in devtools registry");
        } else {
            debug!(key = %key, "Store registered with devtools");
        }
    }

    /// Remove `key` if it still points at `store`
    pub(crate) fn remove(&self, key: &str, store: &Store) -> bool {
        let mut entries = self.entries.write();
        let owned = entries
            .get(key)
            .is_some_and(|entry| Weak::ptr_eq(entry, &store.downgrade()));

        if owned {
            entries.remove(key);
            debug!(key = %key, "Store removed from devtools");
        }
        owned
    }

    /// Look up a live store
    pub fn get(&self, key: &str) -> Option<Store> {
        self.entries
            .read()
            .get(key)?
            .upgrade()
            .map(Store::from_inner)
    }

    /// Keys of every live store, in key order
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.strong_count() > 0)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of live stores
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current snapshot of every live store, in key order
    pub fn inspect(&self) -> Vec<(String, Snapshot)> {
        let live: Vec<(String, Store)> = self
            .entries
            .read()
            .iter()
            .filter_map(|(key, entry)| Some((key.clone(), Store::from_inner(entry.upgrade()?))))
            .collect();

        live.into_iter()
            .map(|(key, store)| (key, store.get_state()))
            .collect()
    }
}

impl std::fmt::Debug for DevtoolsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevtoolsRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::create_store;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_named_registration() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let store = create_store(
            json!({ "count": 0 }),
            StoreConfig::named("counter").with_registry(Arc::clone(&registry)),
        )
        .unwrap();

        assert_eq!(store.devtools_key(), Some("counter"));
        assert_eq!(registry.keys(), vec!["counter".to_string()]);

        store.set(json!({ "count": 2 })).unwrap();
        let found = registry.get("counter").unwrap();
        assert_eq!(found.get_state()["count"].as_i64(), Some(2));
    }

    #[test]
    fn test_auto_increment_keys() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let config = StoreConfig::new().with_registry(Arc::clone(&registry));

        let a = create_store(json!({}), config.clone()).unwrap();
        let b = create_store(json!({}), config).unwrap();

        assert_eq!(a.devtools_key(), Some("store-0"));
        assert_eq!(b.devtools_key(), Some("store-1"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_destroy_unregisters() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let store = create_store(json!({}), StoreConfig::named("temp").with_registry(Arc::clone(&registry))).unwrap();

        store.destroy();

        assert!(registry.get("temp").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_devtools_disabled_skips_registration() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let store = create_store(
            json!({}),
            StoreConfig::named("hidden")
                .with_devtools(false)
                .with_registry(Arc::clone(&registry)),
        )
        .unwrap();

        assert!(store.devtools_key().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replaced_entry_survives_old_destroy() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let config = StoreConfig::named("shared").with_registry(Arc::clone(&registry));

        let old = create_store(json!({ "v": 1 }), config.clone()).unwrap();
        let new = create_store(json!({ "v": 2 }), config).unwrap();
        old.destroy();

        let found = registry.get("shared").unwrap();
        assert_eq!(found.get_state()["v"].as_i64(), Some(2));
        drop(new);
    }

    #[test]
    fn test_dropped_store_is_not_live() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let store = create_store(json!({}), StoreConfig::named("gone").with_registry(Arc::clone(&registry))).unwrap();

        drop(store);

        assert!(registry.get("gone").is_none());
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn test_inspect() {
        let registry = Arc::new(DevtoolsRegistry::new());
        let _a = create_store(json!({ "n": 1 }), StoreConfig::named("a").with_registry(Arc::clone(&registry))).unwrap();
        let _b = create_store(json!({ "n": 2 }), StoreConfig::named("b").with_registry(Arc::clone(&registry))).unwrap();

        let inspected = registry.inspect();

        assert_eq!(inspected.len(), 2);
        assert_eq!(inspected[0].0, "a");
        assert_eq!(inspected[1].1["n"].as_i64(), Some(2));
    }
}
