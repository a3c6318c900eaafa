//! Region-keyed cache of stock listings
//!
//! Two backends are provided: [`MemoryCacheStore`] keeps entries in a
//! process-local map, [`SqliteCacheStore`] persists them in a single SQLite
//! table. Both hold at most one entry per region and are reset at startup.

mod memory;
mod sqlite;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

use crate::error::{Result, StocksError};
use crate::model::{CacheEntry, RegionKey};
use async_trait::async_trait;
use std::time::Duration;

/// Storage contract used by the retriever and the eviction loop
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the backing schema if it does not exist
    async fn init_schema(&self) -> Result<()>;

    /// Look up the entry for a region
    async fn get(&self, region: &RegionKey) -> Result<Option<CacheEntry>>;

    /// Insert or replace the entry for `entry.region`
    async fn put(&self, entry: CacheEntry) -> Result<()>;

    /// Remove every entry older than `ttl`, returning how many were removed
    ///
    /// The cutoff is taken once per call; entries written after the pass
    /// started are never removed by it.
    async fn delete_expired(&self, ttl: Duration) -> Result<usize>;

    /// Drop all entries along with the backing schema
    async fn delete_all(&self) -> Result<()>;

    /// Number of cached regions
    async fn len(&self) -> Result<usize>;

    /// Drop and recreate the store, as done on process start
    async fn reset(&self) -> Result<()> {
        self.delete_all().await?;
        self.init_schema().await
    }
}

pub(crate) fn chrono_ttl(ttl: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(ttl)
        .map_err(|e| StocksError::ConfigError(format!("TTL out of range: {e}")))
}
