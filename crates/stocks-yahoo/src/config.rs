//! Configuration for the Yahoo screener source

use std::time::Duration;
use stocks_core::{Result, StocksError};
use url::Url;

/// Default API host for screener and crumb requests
pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/";
/// Page that hands out the session cookie the crumb is bound to
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com/";

/// Screener source settings
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// API host; screener and crumb paths are joined onto it
    pub base_url: Url,

    /// Visited once per session to obtain cookies; `None` skips the visit
    pub cookie_url: Option<Url>,

    /// Rows requested per page
    pub page_size: usize,

    /// Upper bound on pages read for one region
    pub max_pages: usize,

    /// Minimum spacing between page requests
    pub page_interval: Duration,

    /// Attempts per session open or page request
    pub max_attempts: u32,

    /// Backoff before the first retry, doubled on each later one
    pub retry_backoff: Duration,

    /// Timeout of a single HTTP request
    pub request_timeout: Duration,

    pub user_agent: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            cookie_url: Some(Url::parse(DEFAULT_COOKIE_URL).expect("default cookie URL is valid")),
            page_size: 250,
            max_pages: 50,
            page_interval: Duration::from_millis(500),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl ScreenerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScreenerConfigBuilder {
        ScreenerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > 250 {
            return Err(StocksError::ConfigError(
                "page_size must be between 1 and 250".to_string(),
            ));
        }

        if self.max_pages == 0 {
            return Err(StocksError::ConfigError(
                "max_pages must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(StocksError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.base_url.cannot_be_a_base() {
            return Err(StocksError::ConfigError(format!(
                "base_url {} cannot be used as a base",
                self.base_url
            )));
        }

        Ok(())
    }
}

/// Builder for ScreenerConfig
#[derive(Debug, Default)]
pub struct ScreenerConfigBuilder {
    base_url: Option<String>,
    cookie_url: Option<Option<String>>,
    page_size: Option<usize>,
    max_pages: Option<usize>,
    page_interval: Option<Duration>,
    max_attempts: Option<u32>,
    retry_backoff: Option<Duration>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ScreenerConfigBuilder {
    /// Set the API host
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the cookie page
    pub fn cookie_url(mut self, url: impl Into<String>) -> Self {
        self.cookie_url = Some(Some(url.into()));
        self
    }

    /// Do not visit a cookie page when opening a session
    pub fn without_cookie_url(mut self) -> Self {
        self.cookie_url = Some(None);
        self
    }

    /// Set rows per page
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set the page limit per region
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Set the spacing between page requests
    pub fn page_interval(mut self, interval: Duration) -> Self {
        self.page_interval = Some(interval);
        self
    }

    /// Set attempts per request
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the initial retry backoff
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ScreenerConfig> {
        let defaults = ScreenerConfig::default();

        let base_url = match self.base_url {
            Some(raw) => parse_url("base_url", &raw)?,
            None => defaults.base_url,
        };
        let cookie_url = match self.cookie_url {
            Some(Some(raw)) => Some(parse_url("cookie_url", &raw)?),
            Some(None) => None,
            None => defaults.cookie_url,
        };

        let config = ScreenerConfig {
            base_url,
            cookie_url,
            page_size: self.page_size.unwrap_or(defaults.page_size),
            max_pages: self.max_pages.unwrap_or(defaults.max_pages),
            page_interval: self.page_interval.unwrap_or(defaults.page_interval),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_backoff: self.retry_backoff.unwrap_or(defaults.retry_backoff),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|e| StocksError::ConfigError(format!("{field} {raw:?} is invalid: {e}")))
}
