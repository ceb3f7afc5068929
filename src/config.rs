use std::{env, str::FromStr, time::Duration};

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_MARKET_DATA_URL: &str = "https://www.quandl.com";

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub market: MarketConfig,
    pub session_ttl: Duration,
}

/// Settings for the upstream dataset API.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MARKET_DATA_URL.to_string(),
            api_key: None,
            max_attempts: 3,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
        }
    }
}

impl MarketConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = MarketConfig::default();

        let base_url = match lookup("MARKET_DATA_URL") {
            Some(raw) => {
                Url::parse(&raw).map_err(|err| ConfigError::Url {
                    url: raw.clone(),
                    reason: err.to_string(),
                })?;
                raw
            }
            None => defaults.base_url,
        };

        let market = MarketConfig {
            base_url,
            api_key: lookup("MARKET_DATA_API_KEY").filter(|key| !key.trim().is_empty()),
            max_attempts: parse_or(&lookup, "FETCH_MAX_ATTEMPTS", defaults.max_attempts)?.max(1),
            connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
        };

        Ok(Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 33507)?,
            market,
            session_ttl: Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECS", 30 * 60)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
