//! Central module for application-wide configuration settings.
//!
//! Configuration comes from `EDUGATE_*` environment variables; every setting has a
//! default so the gateway starts with no environment at all.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_IDENTITY_URL: &str = "https://ss-dash-be.onrender.com/api";
pub const DEFAULT_HEALTH_URL: &str = "http://localhost:4000/health";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    /// Base URL of the identity service, e.g. `https://host/api`.
    pub identity_url: String,
    pub health_url: String,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    /// Retries after the first failed health probe.
    pub status_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            health_url: DEFAULT_HEALTH_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            status_retries: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind: parse(&lookup, "EDUGATE_BIND")?.unwrap_or(defaults.bind),
            identity_url: lookup("EDUGATE_IDENTITY_URL").unwrap_or(defaults.identity_url),
            health_url: lookup("EDUGATE_HEALTH_URL").unwrap_or(defaults.health_url),
            request_timeout: parse(&lookup, "EDUGATE_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            health_timeout: parse(&lookup, "EDUGATE_HEALTH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.health_timeout),
            status_retries: parse(&lookup, "EDUGATE_STATUS_RETRIES")?
                .unwrap_or(defaults.status_retries),
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
                value,
            }),
    }
}
