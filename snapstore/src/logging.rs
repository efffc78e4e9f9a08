//! Logging setup for applications embedding snapstore
//!
//! The library itself only emits `tracing` events: writes and change
//! notifications at debug, no-op writes at trace, devtools replacement at
//! warn and reported failures at error. Nothing is printed until the host
//! installs a subscriber, either its own or one from this module.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output style for the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// No subscriber; every event is dropped
    #[default]
    Silent,
    /// Compact stderr output, `info` by default
    Development,
    /// Pretty output with thread ids and source locations, `debug` by default
    Debug,
    /// One JSON object per event on stderr, `info` by default
    Json,
}

impl LoggingMode {
    /// Parse a `SNAPSTORE_LOG_MODE` value; unknown values are `None`
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(Self::Silent),
            "development" | "dev" => Some(Self::Development),
            "debug" => Some(Self::Debug),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Install a global subscriber for `mode`
///
/// Call once near startup. A second call fails with
/// [`LoggingError::TracingInit`] because a global subscriber is already set.
///
/// # Examples
///
/// ```rust,ignore
/// snapstore::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `SNAPSTORE_LOG_LEVEL`: filter directives, e.g. `snapstore=trace`
/// - `RUST_LOG`: used when `SNAPSTORE_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Install a subscriber chosen by `SNAPSTORE_LOG_MODE`
///
/// Accepts `silent`, `development` (or `dev`), `debug` and `json`.
/// Anything else, including an unset variable, means
/// [`LoggingMode::Silent`].
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = std::env::var("SNAPSTORE_LOG_MODE")
        .ok()
        .and_then(|value| LoggingMode::from_env_value(&value))
        .unwrap_or_default();

    init_logging(mode)
}

/// `SNAPSTORE_LOG_LEVEL`, then `RUST_LOG`, then `default_level`
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var("SNAPSTORE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter(format!("{directives}: {e}")))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

/// Same as `init_logging(LoggingMode::Silent)`
pub fn init_silent() -> Result<(), LoggingError> {
    init_logging(LoggingMode::Silent)
}
