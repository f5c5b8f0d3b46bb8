//! Sync configuration.
//!
//! # Responsibility
//! - Carry remote endpoint, cadence, record limit and retry settings.
//! - Load settings from JSON and reject unusable values.
//!
//! # Invariants
//! - A validated config has a non-empty URL, a non-zero interval, a non-zero
//!   record limit and at least one fetch attempt.

use crate::sync::reconciler::ResolutionStrategy;
use crate::sync::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Public test endpoint polled by default.
pub const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";
/// Foreground poll cadence in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
/// Maximum remote records mapped per fetch.
pub const DEFAULT_REMOTE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "failed to parse sync config: {message}"),
            Self::Invalid(details) => write!(f, "invalid sync config: {details}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub remote_url: String,
    pub interval_secs: u64,
    pub remote_limit: usize,
    pub retry: RetryPolicy,
    /// When set, background cycles commit conflicts with this strategy
    /// instead of leaving them pending for the caller.
    pub auto_strategy: Option<ResolutionStrategy>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            remote_limit: DEFAULT_REMOTE_LIMIT,
            retry: RetryPolicy::default(),
            auto_strategy: None,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a JSON config; missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_url.trim().is_empty() {
            return Err(ConfigError::Invalid("remote_url cannot be empty"));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("interval_secs must be positive"));
        }
        if self.remote_limit == 0 {
            return Err(ConfigError::Invalid("remote_limit must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
