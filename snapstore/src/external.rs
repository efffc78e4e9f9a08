//! ExternalStore - the contract a rendering layer subscribes through
//!
//! A rendering layer that reads external state needs three functions:
//! subscribe, read the current snapshot, and read the hydration snapshot.
//! [`ExternalStore`] names exactly those, and [`SnapshotWatcher`] is a
//! small synchronous consumer of it for code that polls instead of
//! reacting to callbacks.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use state_store::{Listener, Snapshot, Unsubscribe};

use crate::store::Store;

/// A source of snapshots with change notification
pub trait ExternalStore {
    /// Register a callback invoked after every change
    fn subscribe(&self, listener: Listener) -> Unsubscribe;

    /// The current snapshot
    fn get_snapshot(&self) -> Snapshot;

    /// The snapshot to hydrate with, when one was configured
    fn get_server_snapshot(&self) -> Option<Snapshot>;
}

impl ExternalStore for Store {
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        Store::subscribe(self, listener)
    }

    fn get_snapshot(&self) -> Snapshot {
        Store::get_snapshot(self)
    }

    fn get_server_snapshot(&self) -> Option<Snapshot> {
        Store::get_server_snapshot(self)
    }
}

/// A polling view over an [`ExternalStore`]
///
/// Marks itself dirty on every notification; the subscription ends when
/// the watcher is dropped.
///
/// # Example
///
/// ```rust
/// use snapstore::{create_store, SnapshotWatcher, StoreConfig};
///
/// let store = create_store(serde_json::json!({ "count": 0 }), StoreConfig::anonymous())?;
/// let watcher = SnapshotWatcher::new(store.clone());
///
/// store.set(serde_json::json!({ "count": 1 }))?;
///
/// if let Some(snapshot) = watcher.take_changed() {
///     assert_eq!(snapshot["count"].as_i64(), Some(1));
/// }
/// assert!(!watcher.has_changed());
/// # Ok::<(), snapstore::StoreError>(())
/// ```
pub struct SnapshotWatcher<S: ExternalStore> {
    source: S,
    dirty: Arc<AtomicBool>,
    subscription: Unsubscribe,
}

impl<S: ExternalStore> SnapshotWatcher<S> {
    pub fn new(source: S) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dirty);
        let subscription = source.subscribe(Listener::new(move || {
            flag.store(true, Ordering::SeqCst);
        }));

        Self {
            source,
            dirty,
            subscription,
        }
    }

    /// Get the current snapshot without touching the dirty flag
    pub fn get(&self) -> Snapshot {
        self.source.get_snapshot()
    }

    /// The hydration snapshot, falling back to the live one
    pub fn get_server(&self) -> Snapshot {
        self.source
            .get_server_snapshot()
            .unwrap_or_else(|| self.source.get_snapshot())
    }

    /// Check if the source changed since the last `take_changed`
    pub fn has_changed(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag and return the current snapshot if it was set
    pub fn take_changed(&self) -> Option<Snapshot> {
        self.dirty
            .swap(false, Ordering::SeqCst)
            .then(|| self.source.get_snapshot())
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: ExternalStore> Drop for SnapshotWatcher<S> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl<S: ExternalStore> fmt::Debug for SnapshotWatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotWatcher")
            .field("dirty", &self.has_changed())
            .finish()
    }
}
