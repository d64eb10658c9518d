//! Engine connection configuration
//!
//! Resolution order, lowest to highest precedence:
//! 1. Built-in defaults (local bigquery-emulator on port 9050)
//! 2. `BQTEST_*` environment variables
//! 3. Explicit overrides (CLI flags)

use super::error::{TestHarnessError, TestHarnessResult};
use std::time::Duration;

pub const ENV_ENDPOINT: &str = "BQTEST_ENDPOINT";
pub const ENV_PROJECT: &str = "BQTEST_PROJECT";
pub const ENV_ACCESS_TOKEN: &str = "BQTEST_ACCESS_TOKEN";
pub const ENV_POLL_INTERVAL_MS: &str = "BQTEST_POLL_INTERVAL_MS";
pub const ENV_QUERY_TIMEOUT_MS: &str = "BQTEST_QUERY_TIMEOUT_MS";

/// Default endpoint of a locally running bigquery-emulator
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9050";

/// Project the emulator is started with
pub const DEFAULT_PROJECT: &str = "test-project";

/// Connection settings for the BigQuery engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base URL, without the `/bigquery/v2` suffix
    pub endpoint: String,

    /// Project that owns datasets and jobs
    pub project: String,

    /// OAuth bearer token; `None` for the emulator
    pub access_token: Option<String>,

    /// Delay between job status polls
    pub poll_interval: Duration,

    /// Upper bound on waiting for a job; `None` waits indefinitely
    pub query_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            access_token: None,
            poll_interval: Duration::from_millis(500),
            query_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `BQTEST_*` environment variables
    pub fn from_env() -> TestHarnessResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> TestHarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.is_empty()) {
            config.endpoint = endpoint;
        }
        if let Some(project) = lookup(ENV_PROJECT).filter(|v| !v.is_empty()) {
            config.project = project;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.is_empty()) {
            config.access_token = Some(token);
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval = Duration::from_millis(parse_millis(ENV_POLL_INTERVAL_MS, &ms)?);
        }
        if let Some(ms) = lookup(ENV_QUERY_TIMEOUT_MS) {
            config.query_timeout = Some(Duration::from_millis(parse_millis(
                ENV_QUERY_TIMEOUT_MS,
                &ms,
            )?));
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> TestHarnessResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(TestHarnessError::ConfigError {
                message: format!("Endpoint must be an http(s) URL, got '{}'", self.endpoint),
            });
        }
        if self.project.trim().is_empty() {
            return Err(TestHarnessError::ConfigError {
                message: "Project cannot be empty".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(TestHarnessError::ConfigError {
                message: "Poll interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> TestHarnessResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| TestHarnessError::ConfigError {
            message: format!("{} must be a number of milliseconds, got '{}': {}", key, value, e),
        })
}
