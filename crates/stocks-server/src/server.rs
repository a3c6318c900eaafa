//! Server lifecycle: startup reset, eviction task, graceful shutdown

use crate::routes::create_router;
use crate::state::AppState;
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use stocks_core::{
    CacheConfig, CacheStore, DataSource, EvictionLoop, MemoryCacheStore, SqliteCacheStore,
    StockRetriever,
};
use stocks_utils::ServerConfig;
use tokio::net::TcpListener;
use tracing::info;

/// Open the cache store selected by the configuration and reset it
pub async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match &config.database_path {
        Some(path) => {
            info!("Using SQLite cache at {}", path.display());
            Arc::new(SqliteCacheStore::open(path)?)
        },
        None => {
            info!("Using in-memory cache");
            Arc::new(MemoryCacheStore::new())
        },
    };

    // Cached listings are never worth keeping across restarts.
    store.reset().await.context("Failed to reset cache store")?;
    Ok(store)
}

/// Run the front end until `shutdown` resolves
///
/// The eviction loop is started before the listener accepts connections and
/// joined after the server has drained.
pub async fn run<F>(
    config: &ServerConfig,
    cache: &CacheConfig,
    source: Box<dyn DataSource>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = open_store(config).await?;
    let retriever = Arc::new(StockRetriever::new(Arc::clone(&store), source, cache));
    let eviction = EvictionLoop::new(store, cache).spawn();

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Listening on http://{}", addr);

    let app = create_router(AppState::new(retriever));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Received shutdown signal, stopping server...");
        })
        .await;

    eviction.stop().await;
    served.context("Server error")?;

    info!("Server stopped gracefully");
    Ok(())
}
