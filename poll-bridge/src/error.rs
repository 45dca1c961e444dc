//! Error types for the poll-bridge crate.

use std::time::Duration;

/// Boxed error returned by a fallible probe.
pub type ProbeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that end a polling wait without an accepted result.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The deadline elapsed before any probe result satisfied the predicate
    #[error("Timed out after {elapsed:?} waiting for condition")]
    Timeout {
        /// Time between bridge creation and the deadline firing
        elapsed: Duration,
    },

    /// A fallible probe returned an error
    #[error("Probe failed on tick {tick}: {source}")]
    ProbeFailed {
        /// 1-based tick on which the probe failed
        tick: u64,
        /// The error returned by the probe
        #[source]
        source: ProbeError,
    },

    /// The probe or the predicate panicked
    #[error("Probe panicked on tick {tick}: {message}")]
    ProbePanicked {
        /// 1-based tick on which the panic happened
        tick: u64,
        /// Panic payload, when it was a string
        message: String,
    },

    /// The wait was cancelled through a [`CancelHandle`](crate::CancelHandle)
    #[error("Wait was cancelled")]
    Cancelled,

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No Tokio runtime was available to drive the timer
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    /// The timer task ended without producing an outcome
    #[error("Polling stopped before an outcome was produced")]
    Stopped,
}

impl PollError {
    /// Returns true if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// Returns true if the probe itself failed or panicked
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            PollError::ProbeFailed { .. } | PollError::ProbePanicked { .. }
        )
    }
}

/// Convenience type alias for Results using PollError.
pub type Result<T> = std::result::Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_error_display() {
        let error = PollError::Timeout {
            elapsed: Duration::from_millis(25),
        };
        assert_eq!(error.to_string(), "Timed out after 25ms waiting for condition");

        let error = PollError::ProbeFailed {
            tick: 3,
            source: "device offline".into(),
        };
        assert_eq!(error.to_string(), "Probe failed on tick 3: device offline");

        let error = PollError::ProbePanicked {
            tick: 1,
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "Probe panicked on tick 1: boom");

        assert_eq!(PollError::Cancelled.to_string(), "Wait was cancelled");

        let error = PollError::InvalidConfig("zero interval".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: zero interval");
    }

    #[test]
    fn test_error_classification() {
        let timeout = PollError::Timeout {
            elapsed: Duration::ZERO,
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_probe_failure());

        let failed = PollError::ProbeFailed {
            tick: 1,
            source: "x".into(),
        };
        assert!(failed.is_probe_failure());
        assert!(!failed.is_timeout());

        assert!(!PollError::Cancelled.is_timeout());
        assert!(!PollError::Stopped.is_probe_failure());
    }

    #[test]
    fn test_probe_failed_exposes_source() {
        use std::error::Error;

        let error = PollError::ProbeFailed {
            tick: 2,
            source: "not connected".into(),
        };
        let source = error.source().expect("source should be set");
        assert_eq!(source.to_string(), "not connected");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        fn returns_error() -> Result<i32> {
            Err(PollError::Cancelled)
        }

        assert_eq!(returns_result().unwrap(), 42);
        assert!(returns_error().is_err());
    }
}
