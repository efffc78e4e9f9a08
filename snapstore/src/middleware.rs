//! Write-path interceptors
//!
//! A middleware receives a [`StoreApi`] and the next [`Writer`] in the chain
//! and returns a new writer. At construction the chain is folded right to
//! left over the store's terminal writer, so the first middleware in the
//! config is the outermost one and the last sits right above the cell.
//!
//! A middleware may rewrite the updater, skip `next` entirely, call it more
//! than once, or wrap it with side effects. Whatever error it returns goes
//! straight back to the `set_state` caller.
//!
//! # Example
//!
//! ```rust
//! use snapstore::{create_store, middleware, StoreConfig, Updater};
//!
//! // Drop every write that tries to make the count negative
//! let guard = middleware::from_fn(|_api, next| {
//!     middleware::writer(move |updater: Updater| {
//!         if let Updater::Patch(patch) = &updater {
//!             if patch["count"].as_i64().is_some_and(|c| c < 0) {
//!                 return Ok(());
//!             }
//!         }
//!         next(updater)
//!     })
//! });
//!
//! let store = create_store(
//!     serde_json::json!({ "count": 0 }),
//!     StoreConfig::anonymous().with_middleware(guard),
//! )?;
//! store.set_state(serde_json::json!({ "count": -1 }))?;
//! assert_eq!(store.get_state()["count"].as_i64(), Some(0));
//! # Ok::<(), snapstore::StoreError>(())
//! ```

use std::sync::Arc;

use state_store::Updater;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::StoreApi;

/// A function that applies an updater to the store
pub type Writer = Arc<dyn Fn(Updater) -> Result<()> + Send + Sync>;

/// Wrap a closure as a [`Writer`]
pub fn writer<F>(f: F) -> Writer
where
    F: Fn(Updater) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An interceptor around the write path
pub trait Middleware: Send + Sync {
    fn wrap(&self, api: StoreApi, next: Writer) -> Writer;
}

/// Middleware built from a closure; see [`from_fn`]
pub struct FromFn<F> {
    f: F,
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(StoreApi, Writer) -> Writer + Send + Sync,
{
    fn wrap(&self, api: StoreApi, next: Writer) -> Writer {
        (self.f)(api, next)
    }
}

/// Build a middleware from a `(api, next) -> writer` closure
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(StoreApi, Writer) -> Writer + Send + Sync,
{
    FromFn { f }
}

/// Fold `middleware` right to left over `terminal`
pub(crate) fn compose(middleware: &[Arc<dyn Middleware>], api: &StoreApi, terminal: Writer) -> Writer {
    middleware
        .iter()
        .rev()
        .fold(terminal, |next, m| m.wrap(api.clone(), next))
}

/// Logs every write and the resulting state at debug level
pub fn logger(label: impl Into<String>) -> impl Middleware {
    let label: Arc<str> = label.into().into();
    from_fn(move |api, next| {
        let label = Arc::clone(&label);
        writer(move |updater| {
            debug!(store = %label, kind = updater.kind(), before = %api.get_state(), "Applying update");
            let result = next(updater);
            match &result {
                Ok(()) => debug!(store = %label, after = %api.get_state(), "Update applied"),
                Err(e) => warn!(store = %label, error = %e, "Update failed"),
            }
            result
        })
    })
}
