//! Diagnostic reporting hook
//!
//! Failures that the store swallows (listener panics) or surfaces after
//! logging (action failures) are handed to an [`ErrorReporter`]. The host
//! decides where they go; [`TracingReporter`] is the default sink.

use std::any::Any;

use thiserror::Error;

/// A failure observed by the store core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// A listener panicked during fan-out. Delivery continued.
    #[error("listener panicked during notification: {message}")]
    Listener { message: String },

    /// A bound action failed. The error is also returned to the caller.
    #[error("action '{name}' failed: {message}")]
    Action { name: String, message: String },
}

/// Sink for failures the store observes
///
/// Implemented for any `Fn(&Failure) + Send + Sync`, so a closure can be
/// injected directly.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, failure: &Failure);
}

impl<F> ErrorReporter for F
where
    F: Fn(&Failure) + Send + Sync,
{
    fn report(&self, failure: &Failure) {
        self(failure)
    }
}

/// Default reporter: logs every failure at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, failure: &Failure) {
        match failure {
            Failure::Listener { message } => {
                tracing::error!(%message, "Listener panicked during notification");
            }
            Failure::Action { name, message } => {
                tracing::error!(action = %name, %message, "Action failed");
            }
        }
    }
}

/// Extract a readable message from a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
