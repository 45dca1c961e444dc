//! Logging setup for the poll bridge
//!
//! The bridge only emits `tracing` events. Hosts that embed the shim decide
//! whether anything is printed; by default nothing is, so the foreign
//! runtime's own stdout/stderr stay clean.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output for development
    Development,
    /// Verbose diagnostics including per-tick trace events
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// Call once, early, before the first bridge is started.
///
/// # Environment Variables
///
/// - `POLL_BRIDGE_LOG_LEVEL`: Override the filter (e.g. `poll_bridge=trace`)
/// - `RUST_LOG`: Used when `POLL_BRIDGE_LOG_LEVEL` is unset
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
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("poll_bridge=trace")?;

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
    }
}

/// Initialize logging from `POLL_BRIDGE_LOG_MODE`
///
/// Accepts "silent", "development" or "debug". Unset means silent; any other
/// value is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = mode_from_env_value(std::env::var("POLL_BRIDGE_LOG_MODE").ok().as_deref())?;
    init_logging(mode)
}

fn mode_from_env_value(value: Option<&str>) -> Result<LoggingMode, LoggingError> {
    match value {
        None | Some("silent") => Ok(LoggingMode::Silent),
        Some("development") => Ok(LoggingMode::Development),
        Some("debug") => Ok(LoggingMode::Debug),
        Some(other) => Err(LoggingError::InvalidEnv(format!(
            "POLL_BRIDGE_LOG_MODE={other}"
        ))),
    }
}

/// Create an environment filter with fallback to default level
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var("POLL_BRIDGE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directives)
        .map_err(|e| LoggingError::InvalidEnv(format!("{directives}: {e}")))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

/// Equivalent to `init_logging(LoggingMode::Silent)`
pub fn init_silent() -> Result<(), LoggingError> {
    init_logging(LoggingMode::Silent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
        assert!(init_silent().is_ok());
    }

    #[test]
    fn test_mode_from_env_value() {
        assert_eq!(mode_from_env_value(None).unwrap(), LoggingMode::Silent);
        assert_eq!(
            mode_from_env_value(Some("development")).unwrap(),
            LoggingMode::Development
        );
        assert_eq!(mode_from_env_value(Some("debug")).unwrap(), LoggingMode::Debug);
        assert!(matches!(
            mode_from_env_value(Some("loud")),
            Err(LoggingError::InvalidEnv(_))
        ));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new("poll_bridge=trace").is_ok());
    }
}
