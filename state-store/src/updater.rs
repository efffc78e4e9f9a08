//! Descriptions of the next state
//!
//! An [`Updater`] is built by a caller, consumed by the write path and then
//! discarded. It is cheap to clone so middleware can forward it more than
//! once.

use std::fmt;
use std::sync::Arc;

use crate::snapshot::{shallow_merge, Snapshot};

/// Pure function from the current snapshot to a patch
pub type ComputeFn = dyn Fn(&Snapshot) -> Snapshot + Send + Sync;

/// How to derive the next snapshot from the current one
#[derive(Clone)]
pub enum Updater {
    /// Shallow-merged into the current snapshot
    Patch(Snapshot),
    /// Called with the current snapshot; the result is shallow-merged
    Compute(Arc<ComputeFn>),
    /// Installed as-is, without merging; the only way to swap out the whole state
    Replace(Snapshot),
}

impl Updater {
    pub fn patch(patch: impl Into<Snapshot>) -> Self {
        Updater::Patch(patch.into())
    }

    pub fn compute<F>(f: F) -> Self
    where
        F: Fn(&Snapshot) -> Snapshot + Send + Sync + 'static,
    {
        Updater::Compute(Arc::new(f))
    }

    pub fn replace(next: impl Into<Snapshot>) -> Self {
        Updater::Replace(next.into())
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Updater::Patch(_) => "patch",
            Updater::Compute(_) => "compute",
            Updater::Replace(_) => "replace",
        }
    }

    /// Produce the candidate snapshot for `current`
    pub fn apply(&self, current: &Snapshot) -> Snapshot {
        match self {
            Updater::Patch(patch) => shallow_merge(current, patch),
            Updater::Compute(f) => shallow_merge(current, &f(current)),
            Updater::Replace(next) => next.clone(),
        }
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Updater::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Updater::Compute(_) => f.write_str("Compute(..)"),
            Updater::Replace(next) => f.debug_tuple("Replace").field(next).finish(),
        }
    }
}

impl From<Snapshot> for Updater {
    fn from(patch: Snapshot) -> Self {
        Updater::Patch(patch)
    }
}

impl From<serde_json::Value> for Updater {
    fn from(patch: serde_json::Value) -> Self {
        Updater::Patch(patch.into())
    }
}
