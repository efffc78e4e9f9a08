//! The state cell
//!
//! Holds the current [`Snapshot`] and applies [`Updater`]s to it. A write
//! computes its candidate outside the lock and installs it only if nothing
//! else was installed in the meantime, so user code never runs while the
//! lock is held and a write is never half-applied.
//!
//! The cell also carries the optional hydration view: an override merged
//! over the *initial* snapshot once, at construction, and frozen from then
//! on.

use parking_lot::RwLock;
use tracing::trace;

use crate::equality::{identical, shallow_equal};
use crate::snapshot::{shallow_merge, Snapshot};
use crate::updater::Updater;

/// Mutable cell holding one immutable snapshot at a time
pub struct StateCell {
    current: RwLock<Snapshot>,
    initial: Snapshot,
    server: Option<Snapshot>,
}

impl StateCell {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: RwLock::new(initial.clone()),
            initial,
            server: None,
        }
    }

    /// Create a cell whose server view is `initial` merged with `server_override`
    pub fn with_server_override(initial: Snapshot, server_override: Snapshot) -> Self {
        let server = shallow_merge(&initial, &server_override);
        Self {
            current: RwLock::new(initial.clone()),
            initial,
            server: Some(server),
        }
    }

    /// The current snapshot
    pub fn read(&self) -> Snapshot {
        self.current.read().clone()
    }

    /// Apply an updater, returning whether the state changed
    ///
    /// A candidate that is shallow-equal to the current snapshot is
    /// discarded and nothing is installed.
    pub fn write(&self, updater: &Updater) -> bool {
        loop {
            let base = self.read();
            let candidate = updater.apply(&base);

            if shallow_equal(&base, &candidate) {
                trace!(kind = updater.kind(), "Write produced no change");
                return false;
            }

            let mut current = self.current.write();
            if identical(&current, &base) {
                *current = candidate;
                return true;
            }
            // Another write landed between read and install; derive again
            // from the snapshot that won.
        }
    }

    /// The frozen server view, or the live snapshot without an override
    pub fn server_snapshot(&self) -> Snapshot {
        match &self.server {
            Some(server) => server.clone(),
            None => self.read(),
        }
    }

    pub fn has_server_override(&self) -> bool {
        self.server.is_some()
    }

    /// The snapshot the cell was created with
    pub fn initial(&self) -> &Snapshot {
        &self.initial
    }
}

impl std::fmt::Debug for StateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("current", &*self.current.read())
            .field("has_server_override", &self.server.is_some())
            .finish()
    }
}
