//! Environment-variable configuration.
//!
//! Connectors are configured through named environment variables with
//! documented defaults. [`Variables`] takes a snapshot so resolution is
//! deterministic for the life of a connector and testable without touching
//! the process environment.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tidewire_types::{Backoff, ConnectorError, RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Default number of messages pulled per `retrieve` call.
pub const DEFAULT_MAX_OUTPUT: usize = 50;

/// Snapshot of configuration variables. Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// # Errors
    ///
    /// Fatal config error when `name` is unset.
    pub fn require(&self, name: &str) -> Result<&str, ConnectorError> {
        self.get(name).ok_or_else(|| {
            ConnectorError::config(
                "MISSING_VARIABLE",
                format!("Environment variable {name} is required"),
            )
        })
    }

    /// Parse `name`, falling back to `default` when unset.
    ///
    /// # Errors
    ///
    /// Fatal config error when the value does not parse.
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T, ConnectorError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            Some(raw) => parse_value(name, raw),
            None => Ok(default),
        }
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConnectorError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        ConnectorError::config(
            "INVALID_VARIABLE",
            format!("Environment variable {name}={raw:?} is invalid: {e}"),
        )
    })
}

/// Engine-level settings shared by every connector.
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | `RETRY_ATTEMPTS` | `3` | Attempts per logical call |
/// | `RETRY_BACKOFF_MS` | `0` | Base delay before a retry, doubled per retry |
/// | `RETRY_BACKOFF_MAX_MS` | `60000` | Upper bound on the retry delay |
/// | `MAX_OUTPUT` | `50` | Messages pulled per `retrieve` call |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub retry: RetryPolicy,
    pub max_batch_size: usize,
}

impl Settings {
    /// # Errors
    ///
    /// Fatal config error for unparsable values, zero attempts or a zero batch size.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let attempts: u32 = vars.parse_or("RETRY_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let backoff_ms: u64 = vars.parse_or("RETRY_BACKOFF_MS", 0)?;
        let backoff_max_ms: u64 = vars.parse_or("RETRY_BACKOFF_MAX_MS", 60_000)?;
        let max_batch_size: usize = vars.parse_or("MAX_OUTPUT", DEFAULT_MAX_OUTPUT)?;

        if max_batch_size == 0 {
            return Err(ConnectorError::config(
                "INVALID_VARIABLE",
                "MAX_OUTPUT must be at least 1",
            ));
        }

        let retry = RetryPolicy::new(attempts)?.with_backoff(Backoff::exponential(
            Duration::from_millis(backoff_ms),
            Duration::from_millis(backoff_max_ms),
        ));

        Ok(Self {
            retry,
            max_batch_size,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_batch_size: DEFAULT_MAX_OUTPUT,
        }
    }
}
