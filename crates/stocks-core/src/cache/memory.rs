use super::{CacheStore, chrono_ttl};
use crate::error::Result;
use crate::model::{CacheEntry, RegionKey};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Thread-safe in-memory cache store
///
/// Clones share the same underlying map.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<RegionKey, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clone for MemoryCacheStore {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, region: &RegionKey) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(region).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.region.clone(), entry);
        Ok(())
    }

    async fn delete_expired(&self, ttl: Duration) -> Result<usize> {
        let ttl = chrono_ttl(ttl)?;
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(ttl, now));
        Ok(before - entries.len())
    }

    async fn delete_all(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StockListing, StockRecord};

    fn listing(symbol: &str, price: &str) -> StockListing {
        let mut listing = StockListing::new();
        listing.insert(
            symbol.to_string(),
            StockRecord {
                symbol: symbol.to_string(),
                name: format!("{symbol} Inc."),
                price: price.to_string(),
            },
        );
        listing
    }

    fn region(name: &str) -> RegionKey {
        RegionKey::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryCacheStore::new();
        let entry = CacheEntry::new(region("brazil"), listing("PETR4.SA", "38.12"));

        store.put(entry.clone()).await.unwrap();

        assert_eq!(store.get(&region("brazil")).await.unwrap(), Some(entry));
        assert_eq!(store.get(&region("chile")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let store = MemoryCacheStore::new();
        store.put(CacheEntry::new(region("brazil"), listing("PETR4.SA", "38.12"))).await.unwrap();
        store.put(CacheEntry::new(region("brazil"), listing("VALE3.SA", "61.10"))).await.unwrap();

        let entry = store.get(&region("brazil")).await.unwrap().unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(entry.content.contains_key("VALE3.SA"));
        assert!(!entry.content.contains_key("PETR4.SA"));
    }

    #[tokio::test]
    async fn test_delete_expired_only_removes_stale_entries() {
        let store = MemoryCacheStore::new();
        let stale = Utc::now() - chrono::Duration::seconds(300);
        store
            .put(CacheEntry::with_timestamp(region("chile"), listing("SQM", "40"), stale))
            .await
            .unwrap();
        store.put(CacheEntry::new(region("brazil"), listing("PETR4.SA", "38.12"))).await.unwrap();

        let removed = store.delete_expired(Duration::from_secs(193)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get(&region("chile")).await.unwrap().is_none());
        assert!(store.get(&region("brazil")).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_put_racing_eviction_survives() {
        let store = MemoryCacheStore::new();
        let stale = Utc::now() - chrono::Duration::seconds(300);

        for round in 0..50 {
            let name = format!("region{round}");
            store
                .put(CacheEntry::with_timestamp(region("chile"), listing("SQM", "40"), stale))
                .await
                .unwrap();

            let writer = store.clone();
            let fresh = CacheEntry::new(region(&name), listing("PETR4.SA", "38.12"));
            let (put, evicted) = tokio::join!(
                tokio::spawn(async move { writer.put(fresh).await }),
                store.delete_expired(Duration::from_secs(193)),
            );
            put.unwrap().unwrap();
            evicted.unwrap();

            assert!(store.get(&region(&name)).await.unwrap().is_some(), "round {round}");
            assert!(store.get(&region("chile")).await.unwrap().is_none(), "round {round}");
        }
    }

    #[tokio::test]
    async fn test_delete_expired_is_idempotent() {
        let store = MemoryCacheStore::new();
        assert_eq!(store.delete_expired(Duration::from_secs(1)).await.unwrap(), 0);
        assert_eq!(store.delete_expired(Duration::from_secs(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_and_shared_clone() {
        let store = MemoryCacheStore::new();
        let clone = store.clone();
        clone.put(CacheEntry::new(region("peru"), listing("BAP", "150"))).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);

        store.reset().await.unwrap();
        assert_eq!(clone.len().await.unwrap(), 0);
    }
}
