//! Configuration types for the poll-bridge crate
//!
//! A [`PollConfig`] carries the two timing knobs of a wait: how often the
//! probe runs and how long the caller is willing to wait overall. It can be
//! built in code or handed over as JSON from the foreign runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PollError, Result};

/// Timing configuration for a single polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Spacing between probe invocations, also the delay before the first one
    /// Default: 100 milliseconds
    #[serde(rename = "poll_interval_ms", with = "duration_millis")]
    pub poll_interval: Duration,

    /// Deadline measured from bridge creation
    /// Default: 10 seconds
    #[serde(rename = "timeout_ms", with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    /// Create a new PollConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for state that settles quickly, such as a property write echo
    pub fn fast_polling() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        }
    }

    /// Config for slow transitions, such as a device finishing a connection
    pub fn patient() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }

    /// Validate the configuration
    ///
    /// A zero poll interval is rejected rather than clamped. The timeout may
    /// be zero, in which case the wait times out without ever probing.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(PollError::InvalidConfig(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a config from JSON such as `{"poll_interval_ms": 10, "timeout_ms": 500}`
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PollError::InvalidConfig(format!("Malformed config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PollError::InvalidConfig(format!("Failed to encode config: {e}")))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
