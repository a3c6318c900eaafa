//! Configuration for caching, eviction and fetch deadlines

use crate::error::{Result, StocksError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`CacheConfig::ttl`], in seconds
pub const ENV_TTL_SECS: &str = "STOCKS_CACHE_TTL_SECS";
/// Environment variable overriding [`CacheConfig::eviction_interval`], in seconds
pub const ENV_EVICTION_INTERVAL_SECS: &str = "STOCKS_EVICTION_INTERVAL_SECS";
/// Environment variable overriding [`CacheConfig::fetch_timeout`], in seconds
pub const ENV_FETCH_TIMEOUT_SECS: &str = "STOCKS_FETCH_TIMEOUT_SECS";

/// Cache lifetime and data source deadlines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached region listing stays valid
    pub ttl: Duration,

    /// Period of the background eviction pass
    pub eviction_interval: Duration,

    /// Deadline for one data source fetch
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(193), // 3 min 13 s
            eviction_interval: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(120),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Defaults overridden by the `STOCKS_*_SECS` environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env()?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ttl", self.ttl),
            ("eviction_interval", self.eviction_interval),
            ("fetch_timeout", self.fetch_timeout),
        ] {
            if value.is_zero() {
                return Err(StocksError::ConfigError(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if chrono::Duration::from_std(self.ttl).is_err() {
            return Err(StocksError::ConfigError("ttl is out of range".to_string()));
        }

        Ok(())
    }
}

/// Builder for CacheConfig
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Duration>,
    eviction_interval: Option<Duration>,
    fetch_timeout: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Set the cache entry lifetime
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Set the eviction tick period
    pub fn eviction_interval(mut self, duration: Duration) -> Self {
        self.eviction_interval = Some(duration);
        self
    }

    /// Set the data source deadline
    pub fn fetch_timeout(mut self, duration: Duration) -> Self {
        self.fetch_timeout = Some(duration);
        self
    }

    /// Apply any `STOCKS_*_SECS` variables present in the environment
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(secs) = env_secs(ENV_TTL_SECS)? {
            self.ttl = Some(secs);
        }
        if let Some(secs) = env_secs(ENV_EVICTION_INTERVAL_SECS)? {
            self.eviction_interval = Some(secs);
        }
        if let Some(secs) = env_secs(ENV_FETCH_TIMEOUT_SECS)? {
            self.fetch_timeout = Some(secs);
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<CacheConfig> {
        let defaults = CacheConfig::default();

        let config = CacheConfig {
            ttl: self.ttl.unwrap_or(defaults.ttl),
            eviction_interval: self.eviction_interval.unwrap_or(defaults.eviction_interval),
            fetch_timeout: self.fetch_timeout.unwrap_or(defaults.fetch_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(raw) => parse_secs(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            StocksError::ConfigError(format!("{name}={raw:?} is not a number of seconds: {e}"))
        })
}
