//! Single-flight cache-or-fetch retrieval
//!
//! [`StockRetriever`] answers "stocks in region X" from the cache when it
//! can, and otherwise drives the data source, normalizes the table and
//! stores the result. The data source is held behind an async mutex, so at
//! most one fetch runs at a time; a request that waited behind a fetch of
//! the same region is answered from that fetch's cache entry.

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::error::{Result, StocksError};
use crate::model::{CacheEntry, RegionKey, StockListing};
use crate::normalize::normalize_table;
use crate::source::DataSource;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where a request ended up in the retrieval state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalState {
    /// Served from the cache, no fetch
    CacheHit,
    /// Missed, driving the data source
    CacheMissFetching,
    /// Data source or normalizer failed; nothing cached
    FetchFailed,
    /// Fetched, normalized and cached
    FetchSucceeded,
}

impl fmt::Display for RetrievalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CacheHit => "cache_hit",
            Self::CacheMissFetching => "cache_miss_fetching",
            Self::FetchFailed => "fetch_failed",
            Self::FetchSucceeded => "fetch_succeeded",
        };
        f.write_str(name)
    }
}

/// Listing together with the terminal state that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub listing: StockListing,
    pub state: RetrievalState,
}

/// Cache-then-fetch orchestrator owning the data source session
pub struct StockRetriever {
    store: Arc<dyn CacheStore>,
    source: Mutex<Box<dyn DataSource>>,
    fetch_timeout: Duration,
}

impl StockRetriever {
    /// Create a retriever that exclusively owns `source`
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Box<dyn DataSource>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            source: Mutex::new(source),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Stocks listed for `region`
    pub async fn resolve(&self, region: &str) -> Result<StockListing> {
        self.resolve_with_state(region).await.map(|resolution| resolution.listing)
    }

    /// Like [`Self::resolve`], also reporting how the answer was produced
    pub async fn resolve_with_state(&self, region: &str) -> Result<Resolution> {
        let region = RegionKey::parse(region)?;

        if let Some(entry) = self.store.get(&region).await? {
            debug!(%region, state = %RetrievalState::CacheHit, "Cache hit");
            return Ok(Resolution {
                listing: entry.content,
                state: RetrievalState::CacheHit,
            });
        }

        debug!(%region, "Cache miss, waiting for data source");
        let mut source = self.source.lock().await;

        // Another request may have fetched this region while we waited.
        if let Some(entry) = self.store.get(&region).await? {
            debug!(%region, state = %RetrievalState::CacheHit, "Served by coalesced fetch");
            return Ok(Resolution {
                listing: entry.content,
                state: RetrievalState::CacheHit,
            });
        }

        debug!(%region, state = %RetrievalState::CacheMissFetching, "Fetching from data source");
        let fetched = tokio::time::timeout(self.fetch_timeout, source.fetch(&region)).await;

        let table = match fetched {
            Ok(Ok(table)) => table,
            Ok(Err(err)) => {
                warn!(
                    %region,
                    state = %RetrievalState::FetchFailed,
                    error = %err,
                    "Data source fetch failed"
                );
                if err.needs_reset() {
                    source.reset().await;
                }
                return Err(err.into());
            },
            Err(_) => {
                warn!(
                    %region,
                    state = %RetrievalState::FetchFailed,
                    "Data source did not answer within {:?}",
                    self.fetch_timeout
                );
                source.reset().await;
                return Err(StocksError::SourceTimeout(format!(
                    "no table for '{region}' within {}s",
                    self.fetch_timeout.as_secs()
                )));
            },
        };

        let listing = normalize_table(&table).inspect_err(|err| {
            warn!(
                %region,
                state = %RetrievalState::FetchFailed,
                error = %err,
                "Discarding malformed table"
            );
        })?;

        self.store
            .put(CacheEntry::new(region.clone(), listing.clone()))
            .await?;
        drop(source);

        info!(
            %region,
            state = %RetrievalState::FetchSucceeded,
            rows = table.rows.len(),
            symbols = listing.len(),
            "Cached region listing"
        );

        Ok(Resolution {
            listing,
            state: RetrievalState::FetchSucceeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::error::InvalidRegionKind;
    use crate::eviction::EvictionLoop;
    use crate::model::{SourceTable, StockRecord};
    use crate::source::{MockDataSource, SourceError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    const COLUMNS: [&str; 3] = ["Symbol", "Name", "Price (Intraday)"];

    fn table(rows: &[[&str; 3]]) -> SourceTable {
        SourceTable::new(
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
            COLUMNS.iter().map(ToString::to_string).collect(),
        )
    }

    fn brazil_table() -> SourceTable {
        table(&[["PETR4.SA", "Petrobras", "38.12"], ["VALE3.SA", "Vale", "61.10"]])
    }

    fn retriever(store: &MemoryCacheStore, source: impl DataSource + 'static) -> StockRetriever {
        StockRetriever::new(
            Arc::new(store.clone()),
            Box::new(source),
            &CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let store = MemoryCacheStore::new();
        let mut cached = StockListing::new();
        cached.insert(
            "SQM".to_string(),
            StockRecord {
                symbol: "SQM".to_string(),
                name: "Sociedad Quimica y Minera".to_string(),
                price: "40.02".to_string(),
            },
        );
        store
            .put(CacheEntry::new(RegionKey::parse("chile").unwrap(), cached.clone()))
            .await
            .unwrap();

        let mut source = MockDataSource::new();
        source.expect_fetch().never();
        let retriever = retriever(&store, source);

        let resolution = retriever.resolve_with_state(" Chile ").await.unwrap();
        assert_eq!(resolution.state, RetrievalState::CacheHit);
        assert_eq!(resolution.listing, cached);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = MemoryCacheStore::new();
        let mut source = MockDataSource::new();
        source
            .expect_fetch()
            .withf(|region| region.as_str() == "brazil")
            .times(1)
            .returning(|_| Ok(brazil_table()));
        let retriever = retriever(&store, source);

        let first = retriever.resolve_with_state("Brazil").await.unwrap();
        let second = retriever.resolve_with_state("brazil").await.unwrap();

        assert_eq!(first.state, RetrievalState::FetchSucceeded);
        assert_eq!(second.state, RetrievalState::CacheHit);
        assert_eq!(first.listing, second.listing);
        assert_eq!(first.listing["VALE3.SA"].price, "61.10");
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_loop_expiry_triggers_refetch() {
        let config = CacheConfig::default();
        let store = MemoryCacheStore::new();
        let mut source = MockDataSource::new();
        source.expect_fetch().times(2).returning(|_| Ok(brazil_table()));
        let retriever = retriever(&store, source);
        let eviction = EvictionLoop::new(Arc::new(store.clone()), &config).spawn();
        let region = RegionKey::parse("brazil").unwrap();

        let first = retriever.resolve_with_state("brazil").await.unwrap();
        assert_eq!(first.state, RetrievalState::FetchSucceeded);

        // Fresh entries survive eviction ticks.
        tokio::time::sleep(config.eviction_interval * 3).await;
        let cached = retriever.resolve_with_state("brazil").await.unwrap();
        assert_eq!(cached.state, RetrievalState::CacheHit);

        // Age the entry past the TTL and let the loop tick again.
        let mut entry = store.get(&region).await.unwrap().unwrap();
        entry.timestamp -= chrono::Duration::seconds(194);
        store.put(entry).await.unwrap();
        tokio::time::sleep(config.eviction_interval * 2).await;
        assert!(store.get(&region).await.unwrap().is_none());

        let again = retriever.resolve_with_state("brazil").await.unwrap();
        assert_eq!(again.state, RetrievalState::FetchSucceeded);

        eviction.stop().await;
    }

    #[tokio::test]
    async fn test_empty_region_rejected_without_side_effects() {
        let store = MemoryCacheStore::new();
        let mut source = MockDataSource::new();
        source.expect_fetch().never();
        source.expect_reset().never();
        let retriever = retriever(&store, source);

        for raw in ["", "   "] {
            match retriever.resolve(raw).await {
                Err(StocksError::InvalidRegion { kind, .. }) => {
                    assert_eq!(kind, InvalidRegionKind::Empty);
                },
                other => panic!("Expected InvalidRegion, got {other:?}"),
            }
        }
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_region_is_not_cached() {
        let store = MemoryCacheStore::new();
        let mut source = MockDataSource::new();
        source
            .expect_fetch()
            .times(2)
            .returning(|region| Err(SourceError::RegionNotFound(region.to_string())));
        source.expect_reset().never();
        let retriever = retriever(&store, source);

        for _ in 0..2 {
            match retriever.resolve("Atlantis").await {
                Err(StocksError::InvalidRegion { region, kind }) => {
                    assert_eq!(region, "atlantis");
                    assert_eq!(kind, InvalidRegionKind::NotRecognized);
                },
                other => panic!("Expected InvalidRegion, got {other:?}"),
            }
        }
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_table_is_not_cached() {
        let store = MemoryCacheStore::new();
        let mut source = MockDataSource::new();
        source.expect_fetch().times(1).returning(|_| {
            Ok(SourceTable::new(
                vec![vec!["AAA".to_string(), "Alpha".to_string()]],
                vec!["Symbol".to_string(), "Name".to_string()],
            ))
        });
        let retriever = retriever(&store, source);

        let err = assert_err!(retriever.resolve("brazil").await);
        assert!(matches!(err, StocksError::MalformedTable(_)));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_source_is_reset() {
        let store = MemoryCacheStore::new();
        let mut source = MockDataSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|_| Err(SourceError::Unavailable("HTTP 503".to_string())));
        source.expect_reset().times(1).return_const(());
        let retriever = retriever(&store, source);

        let err = assert_err!(retriever.resolve("brazil").await);
        assert!(err.is_retryable());
        assert!(matches!(err, StocksError::SourceUnavailable(_)));
    }

    /// Source that records how many fetches overlap and when each ran
    #[derive(Clone, Default)]
    struct RecordingSource {
        delay: Duration,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        fetches: Arc<AtomicUsize>,
        resets: Arc<AtomicUsize>,
        intervals: Arc<std::sync::Mutex<Vec<(Instant, Instant)>>>,
    }

    #[async_trait]
    impl DataSource for RecordingSource {
        async fn fetch(
            &mut self,
            _region: &RegionKey,
        ) -> std::result::Result<SourceTable, SourceError> {
            let started = Instant::now();
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            self.fetches.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            self.intervals.lock().unwrap().push((started, Instant::now()));
            Ok(brazil_table())
        }

        async fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_serialize() {
        let store = MemoryCacheStore::new();
        let source = RecordingSource {
            delay: Duration::from_millis(50),
            ..Default::default()
        };
        let retriever = Arc::new(retriever(&store, source.clone()));

        let a = tokio::spawn({
            let retriever = Arc::clone(&retriever);
            async move { retriever.resolve("brazil").await }
        });
        let b = tokio::spawn({
            let retriever = Arc::clone(&retriever);
            async move { retriever.resolve("argentina").await }
        });
        assert_ok!(a.await.unwrap());
        assert_ok!(b.await.unwrap());

        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        let mut intervals = source.intervals.lock().unwrap().clone();
        intervals.sort();
        assert_eq!(intervals.len(), 2);
        assert!(intervals[0].1 <= intervals[1].0, "fetch sessions overlapped: {intervals:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_region_coalesces() {
        let store = MemoryCacheStore::new();
        let source = RecordingSource {
            delay: Duration::from_millis(50),
            ..Default::default()
        };
        let retriever = Arc::new(retriever(&store, source.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let retriever = Arc::clone(&retriever);
                tokio::spawn(async move { retriever.resolve_with_state("brazil").await })
            })
            .collect();

        let mut states = Vec::new();
        for handle in handles {
            states.push(handle.await.unwrap().unwrap().state);
        }

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(
            states.iter().filter(|s| **s == RetrievalState::FetchSucceeded).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_resets_and_releases_source() {
        let store = MemoryCacheStore::new();
        let source = RecordingSource {
            delay: Duration::from_secs(600),
            ..Default::default()
        };
        let config = CacheConfig::builder()
            .fetch_timeout(Duration::from_secs(120))
            .build()
            .unwrap();
        let retriever =
            StockRetriever::new(Arc::new(store.clone()), Box::new(source.clone()), &config);

        let err = assert_err!(retriever.resolve("brazil").await);
        assert!(matches!(err, StocksError::SourceTimeout(ref msg) if msg.contains("120s")));
        assert_eq!(source.resets.load(Ordering::SeqCst), 1);
        assert_eq!(store.len().await.unwrap(), 0);

        // The abandoned fetch released the session for the next caller.
        let err = assert_err!(retriever.resolve("chile").await);
        assert!(matches!(err, StocksError::SourceTimeout(_)));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
