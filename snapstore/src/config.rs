//! Configuration types for store construction
//!
//! [`StoreConfig`] controls everything `create_store` does besides holding
//! the initial snapshot: the middleware chain, devtools registration, the
//! hydration override and where failures are reported.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use state_store::{ErrorReporter, Snapshot, TracingReporter};

use crate::devtools::DevtoolsRegistry;
use crate::error::{Result, StoreError};
use crate::middleware::Middleware;

/// Server-side rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrConfig {
    /// Partial state merged over the initial snapshot for the frozen
    /// server view
    pub initial_state: Snapshot,
}

/// Configuration for `create_store`
#[derive(Clone)]
pub struct StoreConfig {
    /// Middleware, outermost first
    /// Default: empty
    pub middleware: Vec<Arc<dyn Middleware>>,

    /// Register the store with `registry` for inspection
    /// Default: true
    pub devtools: bool,

    /// Registry key; an auto-incremented key is used when absent
    /// Default: None
    pub name: Option<String>,

    /// Hydration override for the server snapshot
    /// Default: None
    pub ssr: Option<SsrConfig>,

    /// Devtools registry owned by the host. Without one nothing is registered.
    /// Default: None
    pub registry: Option<Arc<DevtoolsRegistry>>,

    /// Sink for listener and action failures
    /// Default: `TracingReporter`
    pub reporter: Option<Arc<dyn ErrorReporter>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            middleware: Vec::new(),
            devtools: true,
            name: None,
            ssr: None,
            registry: None,
            reporter: None,
        }
    }
}

impl StoreConfig {
    /// Create a StoreConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// A config registered under `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// A config that never registers with devtools
    pub fn anonymous() -> Self {
        Self {
            devtools: false,
            ..Default::default()
        }
    }

    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_devtools(mut self, enabled: bool) -> Self {
        self.devtools = enabled;
        self
    }

    /// Configure the hydration override
    pub fn with_ssr(mut self, initial_state: impl Into<Snapshot>) -> Self {
        self.ssr = Some(SsrConfig {
            initial_state: initial_state.into(),
        });
        self
    }

    pub fn with_registry(mut self, registry: Arc<DevtoolsRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Validate the configuration
    ///
    /// Any SSR override is accepted; one that is not an object merges to
    /// the initial snapshot unchanged.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(StoreError::Configuration(
                    "Store name must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn reporter_or_default(&self) -> Arc<dyn ErrorReporter> {
        self.reporter
            .clone()
            .unwrap_or_else(|| Arc::new(TracingReporter))
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("middleware_count", &self.middleware.len())
            .field("devtools", &self.devtools)
            .field("name", &self.name)
            .field("ssr", &self.ssr)
            .field("has_registry", &self.registry.is_some())
            .field("has_reporter", &self.reporter.is_some())
            .finish()
    }
}
