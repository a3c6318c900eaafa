//! Yahoo Finance equity screener as a [`DataSource`]

use crate::config::ScreenerConfig;
use crate::regions::{self, Region};
use crate::retry::RetryPolicy;
use crate::wire::{COLUMNS, ScreenerEnvelope, ScreenerPage, ScreenerQuote, screener_query};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use stocks_core::{DataSource, RegionKey, SourceError, SourceTable};
use tracing::{debug, info, warn};
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const CRUMB_PATH: &str = "v1/test/getcrumb";
const SCREENER_PATH: &str = "v1/finance/screener";

/// Cookie-bearing HTTP client plus the crumb issued for it
#[derive(Debug, Clone)]
struct Session {
    client: Client,
    crumb: String,
}

impl Session {
    async fn open(config: &ScreenerConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("Failed to build HTTP client: {e}")))?;

        if let Some(cookie_url) = &config.cookie_url {
            // Only the cookies matter here; the page itself may well be a 404.
            client
                .get(cookie_url.clone())
                .send()
                .await
                .map_err(transport_error)?;
        }

        let crumb_url = join(&config.base_url, CRUMB_PATH)?;
        let response = client.get(crumb_url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("Crumb request failed: HTTP {status}")));
        }

        let crumb = response.text().await.map_err(transport_error)?.trim().to_string();
        if crumb.is_empty() {
            return Err(SourceError::Unavailable("Empty crumb".to_string()));
        }

        debug!("Opened screener session");
        Ok(Self { client, crumb })
    }

    async fn page(&self, url: &Url, body: &serde_json::Value) -> Result<ScreenerPage, SourceError> {
        let response = self
            .client
            .post(url.clone())
            .query(&[
                ("crumb", self.crumb.as_str()),
                ("lang", "en-US"),
                ("region", "US"),
                ("formatted", "true"),
            ])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Unavailable(format!(
                "Screener session rejected: HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("Screener request failed: HTTP {status}")));
        }

        let envelope: ScreenerEnvelope = response.json().await.map_err(transport_error)?;
        if let Some(error) = envelope.finance.error {
            return Err(SourceError::Unavailable(format!("Screener error: {error}")));
        }

        Ok(envelope
            .finance
            .result
            .and_then(|pages| pages.into_iter().next())
            .unwrap_or_default())
    }
}

/// Screener-backed data source
///
/// Keeps one session (cookies + crumb) between fetches and pages through
/// the screener until a short page or the reported total. A listing still
/// incomplete after `max_pages` is an error, never a partial table.
pub struct YahooScreenerSource {
    config: ScreenerConfig,
    retry: RetryPolicy,
    pacer: Option<SharedRateLimiter>,
    session: Option<Session>,
}

impl YahooScreenerSource {
    pub fn new(config: ScreenerConfig) -> Self {
        let retry = RetryPolicy::new(config.max_attempts, config.retry_backoff);
        let pacer = Quota::with_period(config.page_interval)
            .map(|quota| Arc::new(RateLimiter::direct(quota)));

        Self {
            config,
            retry,
            pacer,
            session: None,
        }
    }

    /// Whether a session is currently open
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    async fn session(&mut self) -> Result<Session, SourceError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        let config = &self.config;
        let session = self
            .retry
            .execute("open screener session", || Session::open(config))
            .await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn collect_rows(
        &self,
        session: &Session,
        region: Region,
    ) -> Result<Vec<Vec<String>>, SourceError> {
        let url = join(&self.config.base_url, SCREENER_PATH)?;
        let size = self.config.page_size;
        let mut rows = Vec::new();
        let mut reported_total = 0;

        for page_no in 0..self.config.max_pages {
            if let Some(pacer) = &self.pacer {
                pacer.until_ready().await;
            }

            let offset = page_no * size;
            let body = screener_query(region.code, offset, size);
            let page = self
                .retry
                .execute("screener page", || session.page(&url, &body))
                .await?;

            debug!(
                region = region.name,
                page = page_no + 1,
                quotes = page.quotes.len(),
                "Read screener page"
            );

            let received = page.quotes.len();
            rows.extend(page.quotes.iter().map(ScreenerQuote::to_row));

            if received < size || offset + received >= page.total {
                return Ok(rows);
            }
            reported_total = page.total;
        }

        // Ran out of pages with more listings still reported.
        warn!(
            region = region.name,
            collected = rows.len(),
            total = reported_total,
            max_pages = self.config.max_pages,
            "Screener listing truncated at page limit"
        );
        Err(SourceError::Unavailable(format!(
            "listing for '{}' truncated at {} of {} rows after {} pages",
            region.name,
            rows.len(),
            reported_total,
            self.config.max_pages
        )))
    }
}

#[async_trait]
impl DataSource for YahooScreenerSource {
    async fn fetch(&mut self, region: &RegionKey) -> Result<SourceTable, SourceError> {
        let region = regions::lookup(region)?;
        let session = self.session().await?;
        let rows = self.collect_rows(&session, region).await?;

        info!(
            region = region.name,
            code = region.code,
            rows = rows.len(),
            "Screener table collected"
        );
        Ok(SourceTable::new(rows, COLUMNS.iter().map(ToString::to_string).collect()))
    }

    async fn reset(&mut self) {
        if self.session.take().is_some() {
            debug!("Dropped screener session");
        }
    }
}

fn join(base: &Url, path: &str) -> Result<Url, SourceError> {
    base.join(path)
        .map_err(|e| SourceError::Unavailable(format!("Invalid screener URL: {e}")))
}

fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(err.to_string())
    } else {
        SourceError::Unavailable(err.to_string())
    }
}
