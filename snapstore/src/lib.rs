//! Snapstore
//!
//! A minimal external state container: one immutable snapshot, a
//! subscribe/notify contract, a middleware chain around every write, and a
//! frozen server snapshot for hydration.
//!
//! # Features
//!
//! - **Shallow Change Detection**: Writes that leave every top-level entry identical notify nobody
//! - **Ordered Notification**: Listeners run in subscription order, a panicking one is reported and skipped
//! - **Middleware**: Wrap the write path to log, validate, persist or rewrite updates
//! - **Hydration Snapshot**: An SSR override merged over the initial state, frozen for the store's lifetime
//! - **Bound Actions**: Named functions from arguments to updaters, with failures reported by name
//! - **Devtools Registry**: Optional named side table for inspecting live stores
//!
//! # Architecture
//!
//! ```text
//! set_state ──▶ middleware[0] ──▶ ... ──▶ middleware[n] ──▶ terminal writer
//!                                                              │
//!                                              StateCell::write (changed?)
//!                                                              │
//!                                                ListenerRegistry::notify_all
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use snapstore::{create_store, Listener, Snapshot, StoreConfig};
//!
//! let store = create_store(serde_json::json!({ "count": 0 }), StoreConfig::anonymous())?;
//!
//! let unsubscribe = store.subscribe(Listener::new(|| println!("state changed")));
//!
//! store.update(|s| Snapshot::object([("count", s["count"].as_i64().unwrap_or(0) + 1)]))?;
//! assert_eq!(store.get_state()["count"].as_i64(), Some(1));
//!
//! unsubscribe.unsubscribe();
//! # Ok::<(), snapstore::StoreError>(())
//! ```
//!
//! # Hydration
//!
//! ```rust
//! use snapstore::{create_store, StoreConfig};
//!
//! let store = create_store(
//!     serde_json::json!({ "count": 0 }),
//!     StoreConfig::anonymous().with_ssr(serde_json::json!({ "count": 5 })),
//! )?;
//!
//! store.set(serde_json::json!({ "count": 9 }))?;
//!
//! assert_eq!(store.get_snapshot()["count"].as_i64(), Some(9));
//! assert_eq!(store.get_server_snapshot().unwrap()["count"].as_i64(), Some(5));
//! # Ok::<(), snapstore::StoreError>(())
//! ```

// Core modules
pub mod action;
pub mod config;
pub mod devtools;
pub mod error;
pub mod external;
pub mod middleware;
pub mod store;

// Logging infrastructure
pub mod logging;

// Re-exports - Public API
pub use action::{create_store_from, Action, Actions, Args, BoundAction, Definition};
pub use config::{SsrConfig, StoreConfig};
pub use devtools::DevtoolsRegistry;
pub use error::{BoxError, Result, StoreError};
pub use external::{ExternalStore, SnapshotWatcher};
pub use middleware::{Middleware, Writer};
pub use store::{create_store, Store, StoreApi};

// Re-exports from the state cell crate
pub use state_store::{
    identical, shallow_equal, shallow_merge, ErrorReporter, Failure, Listener, Map, Snapshot,
    TracingReporter, Unsubscribe, Updater,
};

// Logging re-exports
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{create_store_from, Action, Definition};
    pub use crate::config::StoreConfig;
    pub use crate::error::{Result, StoreError};
    pub use crate::external::ExternalStore;
    pub use crate::middleware::{self, Middleware};
    pub use crate::store::{create_store, Store};
    pub use state_store::{Listener, Snapshot, Updater};
}
