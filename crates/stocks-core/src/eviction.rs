//! Background expiry of stale cache entries

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Periodic `delete_expired` pass over a cache store
#[derive(Clone)]
pub struct EvictionLoop {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    interval: Duration,
}

impl EvictionLoop {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl,
            interval: config.eviction_interval,
        }
    }

    /// Run a single pass, returning how many entries were removed
    ///
    /// Store failures are logged and reported as zero removals.
    pub async fn run_once(&self) -> usize {
        match self.store.delete_expired(self.ttl).await {
            Ok(0) => 0,
            Ok(removed) => {
                debug!(removed, ttl_secs = self.ttl.as_secs(), "Evicted expired cache entries");
                removed
            },
            Err(e) => {
                error!("Cache eviction pass failed: {}", e);
                0
            },
        }
    }

    /// Start ticking on the current runtime until the handle is stopped
    pub fn spawn(self) -> EvictionHandle {
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(Arc::clone(&shutdown)));
        EvictionHandle { shutdown, task }
    }

    async fn run(self, shutdown: Arc<Notify>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            ttl_secs = self.ttl.as_secs(),
            "Cache eviction loop starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.notified() => {
                    info!("Cache eviction loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }
}

/// Stop signal and join handle of a running eviction loop
pub struct EvictionHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl EvictionHandle {
    /// Signal the loop and wait for it to finish its current pass
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            error!("Cache eviction task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
