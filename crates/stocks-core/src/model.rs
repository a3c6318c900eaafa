//! Region keys, stock records and cache entries

use crate::error::{Result, StocksError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalized region name, used as the cache key
///
/// Always lower-cased, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionKey(String);

impl RegionKey {
    /// Normalize raw user input into a region key
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(StocksError::empty_region(raw));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionKey {
    type Error = StocksError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RegionKey> for String {
    fn from(key: RegionKey) -> Self {
        key.0
    }
}

/// One stock as returned to clients
///
/// `price` is kept exactly as the source displayed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub symbol: String,
    pub name: String,
    pub price: String,
}

/// Symbol → record mapping, serialized in symbol order
pub type StockListing = BTreeMap<String, StockRecord>;

/// One scraped table row, cells aligned with [`SourceTable::col_names`]
pub type RawRow = Vec<String>;

/// Complete row set returned by one data source fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    pub rows: Vec<RawRow>,
    pub col_names: Vec<String>,
}

impl SourceTable {
    pub fn new(rows: Vec<RawRow>, col_names: Vec<String>) -> Self {
        Self { rows, col_names }
    }
}

/// Cached listing for one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub region: RegionKey,
    pub content: StockListing,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry stamped with the current time
    pub fn new(region: RegionKey, content: StockListing) -> Self {
        Self::with_timestamp(region, content, Utc::now())
    }

    pub fn with_timestamp(
        region: RegionKey,
        content: StockListing,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            region,
            content,
            timestamp,
        }
    }

    /// Whether the entry is older than `ttl` at instant `now`
    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.timestamp > ttl
    }
}
