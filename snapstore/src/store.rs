//! The store facade
//!
//! A [`Store`] composes the state cell, the listener registry and the
//! middleware chain into the public contract: get, set, subscribe,
//! snapshot and destroy.
//!
//! # Architecture
//!
//! ```text
//! Store (cheap clonable handle)
//! └── StoreInner
//!     ├── cell: StateCell            current + frozen server snapshot
//!     ├── listeners: ListenerRegistry
//!     ├── writer: Writer             middleware folded over the terminal writer
//!     └── registration               optional devtools entry
//!
//! set_state ─▶ middleware ... ─▶ terminal: cell.write ─(changed)─▶ notify_all
//! ```
//!
//! Notification is tied to the terminal writer rather than to the cell
//! because middleware may rewrite, drop or repeat a write before the cell
//! sees it.
//!
//! # Lifecycle
//!
//! `ACTIVE ─▶ DESTROYED`. After [`Store::destroy`] writes are silently
//! ignored, subscriptions are inert and the devtools entry is gone.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use state_store::{
    shallow_equal, ErrorReporter, Failure, Listener, ListenerRegistry, Snapshot, StateCell,
    Unsubscribe, Updater,
};
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::devtools::DevtoolsRegistry;
use crate::error::Result;
use crate::middleware::{self, Writer};

struct Registration {
    registry: Arc<DevtoolsRegistry>,
    key: String,
}

pub(crate) struct StoreInner {
    cell: StateCell,
    listeners: ListenerRegistry,
    writer: OnceLock<Writer>,
    destroyed: AtomicBool,
    name: Option<String>,
    registration: Option<Registration>,
    reporter: Arc<dyn ErrorReporter>,
}

impl StoreInner {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

/// Create a store holding `initial`
///
/// Validates `config`, composes its middleware and, when devtools are
/// enabled and a registry is supplied, registers the store under its name
/// or the next auto-incremented key.
///
/// # Example
///
/// ```rust
/// use snapstore::{create_store, Snapshot, StoreConfig, Updater};
///
/// let store = create_store(serde_json::json!({ "count": 0 }), StoreConfig::default())?;
///
/// store.set_state(Updater::compute(|s| {
///     Snapshot::object([("count", s["count"].as_i64().unwrap_or(0) + 1)])
/// }))?;
///
/// assert_eq!(store.get_state()["count"].as_i64(), Some(1));
/// # Ok::<(), snapstore::StoreError>(())
/// ```
pub fn create_store(initial: impl Into<Snapshot>, config: StoreConfig) -> Result<Store> {
    let initial = initial.into();
    config.validate()?;

    let cell = match &config.ssr {
        Some(ssr) => StateCell::with_server_override(initial, ssr.initial_state.clone()),
        None => StateCell::new(initial),
    };

    let registration = if config.devtools {
        config.registry.as_ref().map(|registry| Registration {
            key: registry.next_key(config.name.as_deref()),
            registry: Arc::clone(registry),
        })
    } else {
        None
    };

    let reporter = config.reporter_or_default();
    let inner = Arc::new(StoreInner {
        cell,
        listeners: ListenerRegistry::new(Arc::clone(&reporter)),
        writer: OnceLock::new(),
        destroyed: AtomicBool::new(false),
        name: config.name.clone(),
        registration,
        reporter,
    });

    let api = StoreApi {
        inner: Arc::downgrade(&inner),
    };
    let composed = middleware::compose(&config.middleware, &api, terminal_writer(&inner));
    let _ = inner.writer.set(composed);

    let store = Store { inner };
    if let Some(registration) = &store.inner.registration {
        registration.registry.insert(registration.key.clone(), &store);
    }

    debug!(
        name = ?store.inner.name,
        middleware = config.middleware.len(),
        ssr = store.inner.cell.has_server_override(),
        "Store created"
    );

    Ok(store)
}

/// The end of the middleware chain: write the cell, notify on change
fn terminal_writer(inner: &Arc<StoreInner>) -> Writer {
    let weak = Arc::downgrade(inner);
    middleware::writer(move |updater| {
        let Some(inner) = weak.upgrade() else {
            return Ok(());
        };
        if inner.is_destroyed() {
            return Ok(());
        }

        if inner.cell.write(&updater) {
            let notified = inner.listeners.notify_all();
            trace!(kind = updater.kind(), notified, "State changed");
        }
        Ok(())
    })
}

/// An external state container
///
/// Cloning a `Store` yields another handle to the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    // ========================================================================
    // Reading
    // ========================================================================

    /// The current snapshot
    pub fn get_state(&self) -> Snapshot {
        self.inner.cell.read()
    }

    /// The current snapshot, under the name rendering layers expect
    pub fn get_snapshot(&self) -> Snapshot {
        self.get_state()
    }

    /// The frozen hydration snapshot, if an SSR override was configured
    pub fn get_server_snapshot(&self) -> Option<Snapshot> {
        self.inner
            .cell
            .has_server_override()
            .then(|| self.inner.cell.server_snapshot())
    }

    /// The frozen hydration snapshot, or the live one without an override
    pub fn server_snapshot_or_live(&self) -> Snapshot {
        self.inner.cell.server_snapshot()
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Route an updater through the middleware chain
    ///
    /// Listeners are notified when the terminal write changes the state.
    /// Errors raised by middleware are returned as-is. On a destroyed store
    /// this does nothing and returns `Ok(())`.
    pub fn set_state(&self, updater: impl Into<Updater>) -> Result<()> {
        if self.inner.is_destroyed() {
            trace!(name = ?self.inner.name, "Ignoring write to destroyed store");
            return Ok(());
        }

        match self.inner.writer.get() {
            Some(writer) => writer(updater.into()),
            None => Ok(()),
        }
    }

    /// Shallow-merge `patch` into the state
    pub fn set(&self, patch: impl Into<Snapshot>) -> Result<()> {
        self.set_state(Updater::patch(patch))
    }

    /// Shallow-merge the patch computed from the current state
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: Fn(&Snapshot) -> Snapshot + Send + Sync + 'static,
    {
        self.set_state(Updater::compute(f))
    }

    /// Replace the state without merging
    pub fn replace(&self, next: impl Into<Snapshot>) -> Result<()> {
        self.set_state(Updater::replace(next))
    }

    /// Restore the initial snapshot through the middleware chain
    pub fn reset(&self) -> Result<()> {
        self.set_state(Updater::Replace(self.inner.cell.initial().clone()))
    }

    // ========================================================================
    // Subscribing
    // ========================================================================

    /// Register a change listener
    ///
    /// On a destroyed store nothing is registered and the returned handle
    /// is inert.
    pub fn subscribe(&self, listener: Listener) -> Unsubscribe {
        if self.inner.is_destroyed() {
            return Unsubscribe::inert();
        }
        self.inner.listeners.add(listener)
    }

    /// Call `on_change` with the selected slice whenever it changes
    ///
    /// The slice is compared with the previous one using shallow equality,
    /// so writes that leave it untouched are filtered out.
    pub fn subscribe_with_selector<S, F>(&self, selector: S, on_change: F) -> Unsubscribe
    where
        S: Fn(&Snapshot) -> Snapshot + Send + Sync + 'static,
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let last = Mutex::new(selector(&self.get_state()));
        let weak = Arc::downgrade(&self.inner);

        self.subscribe(Listener::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let next = selector(&inner.cell.read());
            let changed = {
                let mut last = last.lock();
                if shallow_equal(&last, &next) {
                    false
                } else {
                    *last = next.clone();
                    true
                }
            };
            if changed {
                on_change(&next);
            }
        }))
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Tear the store down
    ///
    /// Clears every listener and removes the devtools entry. Calling it
    /// again is a no-op.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.listeners.clear();
        if let Some(registration) = &self.inner.registration {
            registration.registry.remove(&registration.key, self);
        }

        debug!(name = ?self.inner.name, "Store destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// The configured name
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The devtools key, when the store is registered
    pub fn devtools_key(&self) -> Option<&str> {
        self.inner.registration.as_ref().map(|r| r.key.as_str())
    }

    // ========================================================================
    // Crate internals
    // ========================================================================

    pub(crate) fn report(&self, failure: &Failure) {
        self.inner.reporter.report(failure);
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<StoreInner>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("state", &self.inner.cell.read())
            .field("listener_count", &self.inner.listeners.len())
            .field("destroyed", &self.inner.is_destroyed())
            .finish()
    }
}

/// The view of a store handed to middleware
///
/// Holds the store weakly; once the store is gone reads return `Null` and
/// writes do nothing.
#[derive(Clone)]
pub struct StoreApi {
    inner: Weak<StoreInner>,
}

impl StoreApi {
    /// The current snapshot
    pub fn get_state(&self) -> Snapshot {
        self.inner
            .upgrade()
            .map(|inner| inner.cell.read())
            .unwrap_or_default()
    }

    /// Dispatch an updater through the whole middleware chain
    pub fn set_state(&self, updater: impl Into<Updater>) -> Result<()> {
        match self.inner.upgrade() {
            Some(inner) => Store::from_inner(inner).set_state(updater),
            None => Ok(()),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner
            .upgrade()
            .map_or(true, |inner| inner.is_destroyed())
    }
}

impl fmt::Debug for StoreApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreApi")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter_store() -> Store {
        create_store(json!({ "count": 0 }), StoreConfig::anonymous()).unwrap()
    }

    fn counting_listener() -> (Listener, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let listener = Listener::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (listener, calls)
    }

    fn increment(s: &Snapshot) -> Snapshot {
        Snapshot::object([("count", s["count"].as_i64().unwrap_or(0) + 1)])
    }

    #[test]
    fn test_store_creation() {
        let store = counter_store();

        assert_eq!(store.get_state()["count"].as_i64(), Some(0));
        assert_eq!(store.get_snapshot(), store.get_state());
        assert!(store.get_server_snapshot().is_none());
        assert!(!store.is_destroyed());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_update_increments() {
        let store = counter_store();

        store.update(increment).unwrap();

        assert_eq!(store.get_state()["count"].as_i64(), Some(1));
    }

    #[test]
    fn test_noop_write_does_not_notify() {
        let store = counter_store();
        let (listener, calls) = counting_listener();
        store.subscribe(listener);

        store.set(json!({ "count": 0 })).unwrap();
        store.set(json!({})).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = counter_store();
        let (listener, calls) = counting_listener();

        let unsubscribe = store.subscribe(listener);
        store.set(json!({ "count": 1 })).unwrap();
        unsubscribe.unsubscribe();
        store.set(json!({ "count": 2 })).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_reads_new_state() {
        let store = counter_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reader = store.clone();
        store.subscribe(Listener::new(move || {
            sink.lock().push(reader.get_snapshot()["count"].as_i64());
        }));

        store.set(json!({ "count": 5 })).unwrap();

        assert_eq!(*seen.lock(), vec![Some(5)]);
    }

    #[test]
    fn test_listener_may_write_reentrantly() {
        let store = counter_store();
        let writer = store.clone();
        store.subscribe(Listener::new(move || {
            let count = writer.get_state()["count"].as_i64().unwrap_or(0);
            if count < 3 {
                writer.set(json!({ "count": count + 1 })).unwrap();
            }
        }));

        store.set(json!({ "count": 1 })).unwrap();

        assert_eq!(store.get_state()["count"].as_i64(), Some(3));
    }

    #[test]
    fn test_replace_and_reset() {
        let store = create_store(json!({ "count": 0, "step": 1 }), StoreConfig::anonymous()).unwrap();

        store.replace(json!({ "count": 9 })).unwrap();
        assert_eq!(store.get_state(), Snapshot::from(json!({ "count": 9 })));

        store.reset().unwrap();
        assert_eq!(store.get_state(), Snapshot::from(json!({ "count": 0, "step": 1 })));
    }

    #[test]
    fn test_server_snapshot_frozen() {
        let store = create_store(
            json!({ "count": 0 }),
            StoreConfig::anonymous().with_ssr(json!({ "count": 5 })),
        )
        .unwrap();

        assert_eq!(store.get_snapshot()["count"].as_i64(), Some(0));
        assert_eq!(store.get_server_snapshot().unwrap()["count"].as_i64(), Some(5));

        store.set(json!({ "count": 9 })).unwrap();

        assert_eq!(store.get_snapshot()["count"].as_i64(), Some(9));
        assert_eq!(store.get_server_snapshot().unwrap()["count"].as_i64(), Some(5));
        assert_eq!(store.server_snapshot_or_live()["count"].as_i64(), Some(5));
    }

    #[test]
    fn test_server_snapshot_or_live_without_override() {
        let store = counter_store();
        store.set(json!({ "count": 2 })).unwrap();

        assert_eq!(store.server_snapshot_or_live()["count"].as_i64(), Some(2));
    }

    #[test]
    fn test_destroy_then_write_is_silent() {
        let store = counter_store();
        let (listener, calls) = counting_listener();
        store.subscribe(listener);

        store.destroy();
        assert!(store.set(json!({ "count": 1 })).is_ok());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get_state()["count"].as_i64(), Some(0));
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let store = counter_store();

        store.destroy();
        store.destroy();

        assert!(store.is_destroyed());
    }

    #[test]
    fn test_subscribe_after_destroy_is_inert() {
        let store = counter_store();
        store.destroy();

        let (listener, _calls) = counting_listener();
        let unsubscribe = store.subscribe(listener);

        assert_eq!(store.listener_count(), 0);
        assert!(!unsubscribe.unsubscribe());
    }

    #[test]
    fn test_selector_fires_only_for_slice_changes() {
        let store = create_store(json!({ "count": 0, "label": "a" }), StoreConfig::anonymous()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        store.subscribe_with_selector(
            |s| s["label"].clone(),
            move |label| sink.lock().push(label.as_str().map(str::to_string)),
        );

        store.set(json!({ "count": 1 })).unwrap();
        store.set(json!({ "label": "b" })).unwrap();
        store.set(json!({ "count": 2, "label": "b" })).unwrap();

        assert_eq!(*seen.lock(), vec![Some("b".to_string())]);
    }

    #[test]
    fn test_clones_share_state() {
        let store = counter_store();
        let other = store.clone();

        store.set(json!({ "count": 4 })).unwrap();

        assert_eq!(other.get_state()["count"].as_i64(), Some(4));
    }

    #[test]
    fn test_api_outlives_store() {
        let store = counter_store();
        let api = StoreApi {
            inner: store.downgrade(),
        };
        drop(store);

        assert!(api.get_state().is_null());
        assert!(api.set_state(json!({ "count": 1 })).is_ok());
        assert!(api.is_destroyed());
    }
}
