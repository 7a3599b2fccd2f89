//! Runtime settings loaded from the environment (and `.env` via dotenvy).

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    /// Base URL of the upstream REST API, without trailing slash.
    pub api_base_url: String,
    /// Enables Postgres-backed checkout drafts when set.
    pub database_url: Option<String>,
    pub upstream_timeout: Duration,
    pub checkout_ttl: Duration,
    pub cookie_secure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            api_base_url: "http://localhost:8080/api".to_string(),
            database_url: None,
            upstream_timeout: Duration::from_secs(10),
            checkout_ttl: Duration::from_secs(120 * 60),
            cookie_secure: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let timeout_secs: u64 = try_load("UPSTREAM_TIMEOUT_SECS", 10)?;
        let ttl_minutes: u64 = try_load("CHECKOUT_TTL_MINUTES", 120)?;

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_base_url: env::var("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            database_url: env::var("APP_DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            upstream_timeout: Duration::from_secs(timeout_secs),
            checkout_ttl: checkout_ttl(ttl_minutes)?,
            cookie_secure: try_load("COOKIE_SECURE", false)?,
        })
    }
}

/// Upper bound for `CHECKOUT_TTL_MINUTES`, one year.
const MAX_CHECKOUT_TTL_MINUTES: u64 = 365 * 24 * 60;

fn checkout_ttl(minutes: u64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_CHECKOUT_TTL_MINUTES).contains(&minutes) {
        return Err(ConfigError::Invalid {
            key: "CHECKOUT_TTL_MINUTES",
            message: format!("must be between 1 and {} minutes", MAX_CHECKOUT_TTL_MINUTES),
        });
    }
    Ok(Duration::from_secs(minutes * 60))
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
