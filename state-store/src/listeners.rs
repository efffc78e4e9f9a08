//! Ordered listener registry with isolated fan-out
//!
//! Listeners are zero-argument callbacks kept in an insertion-ordered set
//! keyed by identity. [`ListenerRegistry::notify_all`] calls each one in
//! registration order without holding the registry lock, so a listener may
//! subscribe, unsubscribe or trigger another write while it runs.
//!
//! # Fan-out rules
//!
//! - A listener removed before its turn is skipped for the rest of the pass.
//! - A listener added during the pass is visited in the same pass.
//! - A panicking listener is reported and the pass continues.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::report::{panic_message, ErrorReporter, Failure};

/// A zero-argument change callback
///
/// Clones share identity: subscribing two clones of one `Listener` results
/// in a single registration.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn() + Send + Sync>);

impl Listener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self) {
        (self.0)()
    }

    /// Whether both handles refer to the same callback
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        self.addr() == other.addr()
    }

    // Stable while any clone is alive, which registration guarantees
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&(self.addr() as *const ())).finish()
    }
}

#[derive(Default)]
struct Entries {
    /// Registration order; `seq` only ever grows
    by_seq: BTreeMap<u64, Listener>,
    /// Listener identity to its `seq`
    by_identity: HashMap<usize, u64>,
    next_seq: u64,
}

impl Entries {
    fn insert(&mut self, listener: &Listener) {
        let seq = self.next_seq;
        if let Entry::Vacant(slot) = self.by_identity.entry(listener.addr()) {
            slot.insert(seq);
            self.by_seq.insert(seq, listener.clone());
            self.next_seq += 1;
        }
    }

    fn remove(&mut self, listener: &Listener) -> bool {
        match self.by_identity.remove(&listener.addr()) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    fn contains(&self, listener: &Listener) -> bool {
        self.by_identity.contains_key(&listener.addr())
    }

    /// The first listener registered at or after `min_seq`
    fn next_from(&self, min_seq: u64) -> Option<(u64, Listener)> {
        self.by_seq
            .range(min_seq..)
            .next()
            .map(|(seq, listener)| (*seq, listener.clone()))
    }

    fn clear(&mut self) {
        self.by_seq.clear();
        self.by_identity.clear();
    }

    fn len(&self) -> usize {
        self.by_seq.len()
    }
}

/// Insertion-ordered, identity-deduplicated set of listeners
pub struct ListenerRegistry {
    entries: Arc<Mutex<Entries>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ListenerRegistry {
    /// Create an empty registry reporting listener panics to `reporter`
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries::default())),
            reporter,
        }
    }

    /// Register a listener
    ///
    /// Adding a listener that is already registered keeps its original
    /// position. The returned handle removes it either way.
    pub fn add(&self, listener: Listener) -> Unsubscribe {
        self.entries.lock().insert(&listener);

        Unsubscribe {
            entries: Arc::downgrade(&self.entries),
            listener: Some(listener),
        }
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove(&self, listener: &Listener) -> bool {
        self.entries.lock().remove(listener)
    }

    /// Invoke every listener in registration order
    ///
    /// Returns the number of listeners invoked, including ones that panicked.
    pub fn notify_all(&self) -> usize {
        let mut min_seq = 0;
        let mut invoked = 0;

        loop {
            let next = self.entries.lock().next_from(min_seq);
            let Some((seq, listener)) = next else {
                break;
            };
            min_seq = seq + 1;
            invoked += 1;

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener.call())) {
                self.reporter.report(&Failure::Listener {
                    message: panic_message(payload.as_ref()),
                });
            }
        }

        invoked
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn contains(&self, listener: &Listener) -> bool {
        self.entries.lock().contains(listener)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.len())
            .finish()
    }
}

/// Handle that removes one listener from its registry
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is a no-op. Dropping
/// the handle does not unsubscribe, and it does not keep the registry alive.
#[derive(Clone, Debug)]
pub struct Unsubscribe {
    entries: Weak<Mutex<Entries>>,
    listener: Option<Listener>,
}

impl Unsubscribe {
    /// A handle attached to nothing
    pub fn inert() -> Self {
        Self {
            entries: Weak::new(),
            listener: None,
        }
    }

    /// Remove the listener; returns whether anything was removed
    pub fn unsubscribe(&self) -> bool {
        match (self.entries.upgrade(), &self.listener) {
            (Some(entries), Some(listener)) => entries.lock().remove(listener),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TracingReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> ListenerRegistry {
        ListenerRegistry::new(Arc::new(TracingReporter))
    }

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Arc::clone(log);
        Listener::new(move || log.lock().push(tag))
    }

    #[test]
    fn test_notify_in_registration_order() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add(recording(&log, "a"));
        registry.add(recording(&log, "b"));
        registry.add(recording(&log, "c"));

        assert_eq!(registry.notify_all(), 3);
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_same_listener_added_twice_is_delivered_once() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let listener = Listener::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.add(listener.clone());
        registry.add(listener.clone());

        assert_eq!(registry.len(), 1);
        registry.notify_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = registry();
        let listener = Listener::new(|| {});

        let unsubscribe = registry.add(listener.clone());
        assert!(registry.contains(&listener));

        assert!(unsubscribe.unsubscribe());
        assert!(!unsubscribe.unsubscribe());
        assert!(!registry.contains(&listener));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_removes_only_its_listener() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.add(recording(&log, "first"));
        registry.add(recording(&log, "second"));

        first.unsubscribe();
        registry.notify_all();

        assert_eq!(*log.lock(), vec!["second"]);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        let registry = ListenerRegistry::new(Arc::new(move |failure: &Failure| {
            sink.lock().push(failure.clone());
        }));
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add(Listener::new(|| panic!("bad subscriber")));
        registry.add(recording(&log, "good"));

        assert_eq!(registry.notify_all(), 2);
        assert_eq!(*log.lock(), vec!["good"]);
        assert_eq!(
            *failures.lock(),
            vec![Failure::Listener {
                message: "bad subscriber".to_string()
            }]
        );
    }

    #[test]
    fn test_unsubscribe_later_listener_during_fan_out() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));

        let victim = recording(&log, "victim");
        let handle = Arc::new(Mutex::new(None::<Unsubscribe>));
        let slot = Arc::clone(&handle);
        let killer_log = Arc::clone(&log);

        registry.add(Listener::new(move || {
            killer_log.lock().push("killer");
            if let Some(unsubscribe) = slot.lock().as_ref() {
                unsubscribe.unsubscribe();
            }
        }));
        *handle.lock() = Some(registry.add(victim));

        registry.notify_all();

        assert_eq!(*log.lock(), vec!["killer"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_listener_removing_itself() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(Mutex::new(None::<Unsubscribe>));

        let slot = Arc::clone(&handle);
        let counter = Arc::clone(&count);
        *handle.lock() = Some(registry.add(Listener::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(unsubscribe) = slot.lock().as_ref() {
                unsubscribe.unsubscribe();
            }
        })));

        registry.notify_all();
        registry.notify_all();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_added_during_fan_out_is_visited() {
        let registry = Arc::new(registry());
        let log = Arc::new(Mutex::new(Vec::new()));

        let late = recording(&log, "late");
        let adder_log = Arc::clone(&log);
        let weak = Arc::downgrade(&registry);
        registry.add(Listener::new(move || {
            adder_log.lock().push("adder");
            if let Some(registry) = weak.upgrade() {
                registry.add(late.clone());
            }
        }));

        registry.notify_all();

        assert_eq!(*log.lock(), vec!["adder", "late"]);
    }

    #[test]
    fn test_clear() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let unsubscribe = registry.add(Listener::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        registry.clear();

        assert_eq!(registry.notify_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!unsubscribe.unsubscribe());
    }

    #[test]
    fn test_readded_listener_moves_to_the_end() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = recording(&log, "first");

        let handle = registry.add(first.clone());
        registry.add(recording(&log, "second"));
        handle.unsubscribe();
        registry.add(first);
        registry.notify_all();

        assert_eq!(*log.lock(), vec!["second", "first"]);
    }

    #[test]
    fn test_many_listeners_with_interleaved_removal() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let count: usize = 20_000;

        let handles: Vec<_> = (0..count)
            .map(|id| {
                let log = Arc::clone(&log);
                registry.add(Listener::new(move || log.lock().push(id)))
            })
            .collect();
        for handle in handles.iter().step_by(3) {
            handle.unsubscribe();
        }

        assert_eq!(registry.notify_all(), count - count.div_ceil(3));
        let expected: Vec<usize> = (0..count).filter(|id| id % 3 != 0).collect();
        assert_eq!(*log.lock(), expected);
    }

    #[test]
    fn test_inert_handle() {
        assert!(!Unsubscribe::inert().unsubscribe());
    }
}
