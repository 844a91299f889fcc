//! Client configuration structures

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::durations::{duration_millis, option_duration_millis};
use crate::errors::{CloudError, Result};

pub const DEFAULT_API_URL: &str = "https://cybsi.cloud";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// Honor proxy settings from the environment.
    #[serde(default = "default_true")]
    pub trust_env: bool,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: default_api_url(),
            ssl_verify: true,
            trust_env: true,
            timeouts: Timeouts::default(),
            limits: Limits::default(),
            retry: RetrySettings::default(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Check invariants that the type system cannot express.
    ///
    /// URL syntax is checked where the URL is parsed, in the connector.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(CloudError::Config("api key must not be empty".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(CloudError::Config("api url must not be empty".into()));
        }
        if self.retry.backoff_min > self.retry.backoff_max {
            return Err(CloudError::Config(format!(
                "retry backoff range is inverted: {:?} > {:?}",
                self.retry.backoff_min, self.retry.backoff_max
            )));
        }
        Ok(())
    }
}

/// Network timeouts. `None` disables the corresponding limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_timeout", with = "option_duration_millis")]
    pub connect: Option<Duration>,
    #[serde(default = "default_timeout", with = "option_duration_millis")]
    pub request: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { connect: Some(DEFAULT_TIMEOUT), request: Some(DEFAULT_TIMEOUT) }
    }
}

/// Connection pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
    #[serde(default = "default_idle_timeout", with = "duration_millis")]
    pub idle_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_idle_per_host: default_max_idle(), idle_timeout: default_idle_timeout() }
    }
}

/// Retry policy for transport failures of idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request; 0 and 1 both mean a single attempt.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_backoff_min", with = "duration_millis")]
    pub backoff_min: Duration,
    #[serde(default = "default_backoff_max", with = "duration_millis")]
    pub backoff_max: Duration,
}

impl RetrySettings {
    pub fn disabled() -> Self {
        Self { attempts: 0, ..Self::default() }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_min: default_backoff_min(),
            backoff_max: default_backoff_max(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> Option<Duration> {
    Some(DEFAULT_TIMEOUT)
}

fn default_max_idle() -> usize {
    20
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_min() -> Duration {
    Duration::from_millis(100)
}

fn default_backoff_max() -> Duration {
    Duration::from_millis(1000)
}
