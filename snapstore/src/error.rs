//! Error types for snapstore

use thiserror::Error;

/// Boxed error returned by actions and middleware
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors visible to callers of the store
///
/// Listener panics never show up here; they go to the
/// [`ErrorReporter`](crate::ErrorReporter) only. Operations on a destroyed
/// store are no-ops, not errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A bound action failed. Already reported before being returned.
    #[error("Action '{name}' failed: {source}")]
    Action {
        name: String,
        #[source]
        source: BoxError,
    },

    /// A middleware rejected or failed a write
    #[error("Middleware failed: {0}")]
    Middleware(#[source] BoxError),

    /// No action is bound under this name
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The store configuration is invalid
    #[error("Invalid store configuration: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Wrap any error raised inside a middleware
    pub fn middleware<E: Into<BoxError>>(err: E) -> Self {
        StoreError::Middleware(err.into())
    }
}

/// Result type for snapstore operations
pub type Result<T> = std::result::Result<T, StoreError>;
