//! Connector configuration.

use std::time::Duration;

use crate::{RetryBudget, ValidationError};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Server location, retry budget and per-request timeout for one connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    pub url: String,
    pub retry: RetryBudget,
    pub timeout_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_URL),
            retry: RetryBudget::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ConnectorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryBudget) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Read `KRONICLE_URL`, `KRONICLE_RETRIES`, `KRONICLE_RETRY_DELAY_MS` and
    /// `KRONICLE_TIMEOUT_MS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let url = lookup("KRONICLE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.url);
        let retries = parse_setting(&lookup, "KRONICLE_RETRIES")?
            .unwrap_or(u64::from(defaults.retry.retries()));
        let delay_ms = parse_setting(&lookup, "KRONICLE_RETRY_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.delay());
        let timeout_ms =
            parse_setting(&lookup, "KRONICLE_TIMEOUT_MS")?.unwrap_or(defaults.timeout_ms);

        let retries = u32::try_from(retries).map_err(|_| ValidationError::InvalidSetting {
            name: "KRONICLE_RETRIES",
            value: retries.to_string(),
        })?;

        Ok(Self {
            url,
            retry: RetryBudget::new(retries, delay_ms)?,
            timeout_ms,
        })
    }
}

fn parse_setting<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| ValidationError::InvalidSetting { name, value: raw })
        })
        .transpose()
}
