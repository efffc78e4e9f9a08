//! Binding actions to a store
//!
//! An action turns caller arguments into an [`Updater`]. Binding it to a
//! store produces a callable that runs the action and forwards the updater
//! to [`Store::set_state`].
//!
//! Two shapes are supported:
//!
//! - [`Action<A>`]: typed per action, bound with [`Store::bind`].
//! - [`Definition`]: a builder that keeps initial-state fields and actions
//!   apart, with uniformly typed `Vec<Snapshot>` arguments. It produces a
//!   store and an [`Actions`] table dispatched by name.
//!
//! An action failure is reported through the store's
//! [`ErrorReporter`](crate::ErrorReporter), tagged with the action name, and
//! then returned to the caller. A panicking action is reported and the
//! panic resumes.
//!
//! # Example
//!
//! ```rust
//! use snapstore::{create_store_from, Definition, Snapshot, StoreConfig, Updater};
//!
//! let definition = Definition::new()
//!     .field("count", 0)
//!     .action("increment", |_args| {
//!         Ok(Updater::compute(|s| {
//!             Snapshot::object([("count", s["count"].as_i64().unwrap_or(0) + 1)])
//!         }))
//!     });
//!
//! let (store, actions) = create_store_from(definition, StoreConfig::anonymous())?;
//! actions.dispatch("increment", vec![])?;
//! actions.dispatch("increment", vec![])?;
//!
//! assert_eq!(store.get_state()["count"].as_i64(), Some(2));
//! # Ok::<(), snapstore::StoreError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use state_store::{panic_message, Failure, Map, Snapshot, Updater};

use crate::config::StoreConfig;
use crate::error::{BoxError, Result, StoreError};
use crate::store::{create_store, Store};

type ActionFn<A> = dyn Fn(A) -> std::result::Result<Updater, BoxError> + Send + Sync;

/// A named function from arguments to an updater
pub struct Action<A> {
    name: Arc<str>,
    f: Arc<ActionFn<A>>,
}

impl<A> Action<A> {
    /// Create a fallible action
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> std::result::Result<Updater, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into().into(),
            f: Arc::new(f),
        }
    }

    /// Create an action that cannot fail
    pub fn infallible<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> Updater + Send + Sync + 'static,
        A: 'static,
    {
        Self::new(name, move |args| Ok(f(args)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A> Clone for Action<A> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            f: Arc::clone(&self.f),
        }
    }
}

impl<A> fmt::Debug for Action<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// An action bound to a store
pub struct BoundAction<A> {
    action: Action<A>,
    store: Store,
}

impl<A> BoundAction<A> {
    /// Run the action and apply its updater
    ///
    /// Action failures are reported, then returned as
    /// [`StoreError::Action`]. Middleware failures come back unchanged.
    pub fn call(&self, args: A) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.action.f)(args)));

        let updater = match outcome {
            Ok(Ok(updater)) => updater,
            Ok(Err(source)) => {
                self.store.report(&Failure::Action {
                    name: self.action.name.to_string(),
                    message: source.to_string(),
                });
                return Err(StoreError::Action {
                    name: self.action.name.to_string(),
                    source,
                });
            }
            Err(payload) => {
                self.store.report(&Failure::Action {
                    name: self.action.name.to_string(),
                    message: panic_message(payload.as_ref()),
                });
                panic::resume_unwind(payload);
            }
        };

        self.store.set_state(updater)
    }

    pub fn name(&self) -> &str {
        self.action.name()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl<A> Clone for BoundAction<A> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            store: self.store.clone(),
        }
    }
}

impl<A> fmt::Debug for BoundAction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("name", &self.action.name)
            .finish()
    }
}

impl Store {
    /// Bind a typed action to this store
    pub fn bind<A>(&self, action: Action<A>) -> BoundAction<A> {
        BoundAction {
            action,
            store: self.clone(),
        }
    }
}

// ============================================================================
// Definition / Actions
// ============================================================================

/// Arguments passed to actions declared on a [`Definition`]
pub type Args = Vec<Snapshot>;

/// Builder separating initial-state fields from actions
#[derive(Default)]
pub struct Definition {
    state: Map,
    actions: Vec<Action<Args>>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an initial-state field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Snapshot>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    /// Add an action; a later action with the same name replaces it
    pub fn action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Args) -> std::result::Result<Updater, BoxError> + Send + Sync + 'static,
    {
        let action = Action::new(name, f);
        self.actions.retain(|existing| existing.name() != action.name());
        self.actions.push(action);
        self
    }

    /// The initial snapshot built from the declared fields
    pub fn initial_state(&self) -> Snapshot {
        Snapshot::from(self.state.clone())
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(Action::name)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("fields", &self.state.keys().collect::<Vec<_>>())
            .field("actions", &self.action_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Actions bound from a [`Definition`], dispatched by name
#[derive(Clone, Debug)]
pub struct Actions {
    store: Store,
    bound: BTreeMap<String, BoundAction<Args>>,
}

impl Actions {
    /// Invoke the action registered under `name`
    pub fn dispatch(&self, name: &str, args: Args) -> Result<()> {
        match self.bound.get(name) {
            Some(action) => action.call(args),
            None => Err(StoreError::UnknownAction(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&BoundAction<Args>> {
        self.bound.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bound.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Create a store from a definition and bind its actions
pub fn create_store_from(definition: Definition, config: StoreConfig) -> Result<(Store, Actions)> {
    let store = create_store(definition.initial_state(), config)?;
    let bound = definition
        .actions
        .into_iter()
        .map(|action| (action.name().to_string(), store.bind(action)))
        .collect();

    let actions = Actions {
        store: store.clone(),
        bound,
    };
    Ok((store, actions))
}
