//! Snapshot State Cell
//!
//! The building blocks of an external state container: an immutable
//! snapshot value, shallow change detection, an ordered listener registry
//! and a cell that only installs a new snapshot when something changed.
//!
//! # Features
//!
//! - **Cheap Snapshots**: Composite values are shared behind `Arc`, clones are O(1)
//! - **Shallow Change Detection**: Per-key identity comparison, never a deep diff
//! - **Ordered Listeners**: Identity-deduplicated, safe to modify during fan-out
//! - **Isolated Fan-out**: A panicking listener is reported, the rest still run
//! - **Hydration View**: A frozen server snapshot alongside the live one
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use state_store::{Listener, ListenerRegistry, Snapshot, StateCell, TracingReporter, Updater};
//!
//! let cell = StateCell::new(Snapshot::from(serde_json::json!({ "count": 0 })));
//! let listeners = ListenerRegistry::new(Arc::new(TracingReporter));
//!
//! let unsubscribe = listeners.add(Listener::new(|| println!("changed")));
//!
//! if cell.write(&Updater::patch(serde_json::json!({ "count": 1 }))) {
//!     listeners.notify_all();
//! }
//! assert_eq!(cell.read()["count"].as_i64(), Some(1));
//!
//! unsubscribe.unsubscribe();
//! ```
//!
//! # Architecture
//!
//! ```text
//! Updater ──▶ StateCell::write ──▶ shallow_equal(current, candidate)
//!                                        │
//!                              changed?  ▼
//!                           ListenerRegistry::notify_all
//!                                        │
//!                                        └── ErrorReporter (listener panics)
//! ```

// Modules
pub mod cell;
pub mod equality;
pub mod listeners;
pub mod report;
pub mod snapshot;
pub mod updater;

// Re-exports - Public API
pub use cell::StateCell;
pub use equality::{identical, shallow_equal};
pub use listeners::{Listener, ListenerRegistry, Unsubscribe};
pub use report::{panic_message, ErrorReporter, Failure, TracingReporter};
pub use snapshot::{shallow_merge, Map, Snapshot};
pub use updater::{ComputeFn, Updater};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cell::StateCell;
    pub use crate::listeners::{Listener, ListenerRegistry, Unsubscribe};
    pub use crate::report::{ErrorReporter, Failure};
    pub use crate::snapshot::Snapshot;
    pub use crate::updater::Updater;
}
