//! Region stock listings with a short-lived cache
//!
//! This crate holds the cache-then-fetch core of region-stocks:
//!
//! - [`RegionKey`]: normalized region names used as cache keys
//! - [`normalize()`]: raw screener rows → deduplicated symbol listing
//! - [`CacheStore`]: region-keyed cache (in-memory or SQLite)
//! - [`DataSource`]: the external, serially reused table provider
//! - [`StockRetriever`]: single-flight cache-or-fetch orchestration
//! - [`EvictionLoop`]: background expiry of stale entries
//!
//! # Example
//!
//! ```rust,ignore
//! use stocks_core::{CacheConfig, EvictionLoop, MemoryCacheStore, StockRetriever};
//! use std::sync::Arc;
//!
//! let config = CacheConfig::default();
//! let store = Arc::new(MemoryCacheStore::new());
//! let retriever = StockRetriever::new(store.clone(), Box::new(my_source), &config);
//! let eviction = EvictionLoop::new(store, &config).spawn();
//!
//! let listing = retriever.resolve("Brazil").await?;
//! eviction.stop().await;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod model;
pub mod normalize;
pub mod retriever;
pub mod source;

pub use cache::{CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use config::CacheConfig;
pub use error::{InvalidRegionKind, Result, StocksError};
pub use eviction::{EvictionHandle, EvictionLoop};
pub use model::{CacheEntry, RawRow, RegionKey, SourceTable, StockListing, StockRecord};
pub use normalize::normalize;
pub use retriever::{Resolution, RetrievalState, StockRetriever};
pub use source::{DataSource, SourceError};
