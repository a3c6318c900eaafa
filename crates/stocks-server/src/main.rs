//! region-stocks HTTP server
//!
//! # Usage
//!
//! ```bash
//! # In-memory cache on 127.0.0.1:5000
//! cargo run --bin region-stocks
//!
//! # SQLite-backed cache, shorter TTL
//! cargo run --bin region-stocks -- --database stocksinfo.db --ttl-secs 60
//!
//! curl -X POST localhost:5000/stocks -H 'content-type: application/json' \
//!      -d '{"region": "Brazil"}'
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use stocks_core::CacheConfig;
use stocks_server::server;
use stocks_utils::config::{DEFAULT_HOST, DEFAULT_PORT};
use stocks_utils::ServerConfig;
use stocks_yahoo::{ScreenerConfig, YahooScreenerSource};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "region-stocks")]
#[command(about = "Serve stock listings per region with a short-lived cache", long_about = None)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "STOCKS_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind
    #[arg(short, long, env = "STOCKS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// SQLite file for the cache (in-memory when omitted)
    #[arg(long, env = "STOCKS_DATABASE")]
    database: Option<PathBuf>,

    /// Cache entry lifetime in seconds [env: STOCKS_CACHE_TTL_SECS]
    #[arg(long)]
    ttl_secs: Option<u64>,

    /// Eviction tick period in seconds [env: STOCKS_EVICTION_INTERVAL_SECS]
    #[arg(long)]
    eviction_interval_secs: Option<u64>,

    /// Data source deadline in seconds [env: STOCKS_FETCH_TIMEOUT_SECS]
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,

    /// Screener API host
    #[arg(long, env = "STOCKS_SCREENER_URL")]
    screener_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "STOCKS_JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            database_path: self.database.clone(),
            json_logs: self.json_logs,
        }
    }

    /// Environment first, command-line flags on top
    fn cache_config(&self) -> stocks_core::Result<CacheConfig> {
        let mut builder = CacheConfig::builder().with_env()?;
        if let Some(secs) = self.ttl_secs {
            builder = builder.ttl(Duration::from_secs(secs));
        }
        if let Some(secs) = self.eviction_interval_secs {
            builder = builder.eviction_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.fetch_timeout_secs {
            builder = builder.fetch_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    fn screener_config(&self) -> stocks_core::Result<ScreenerConfig> {
        let mut builder = ScreenerConfig::builder();
        if let Some(url) = &self.screener_url {
            builder = builder.base_url(url.as_str());
        }
        builder.build()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.server_config();

    stocks_utils::init_tracing(config.json_logs);

    let cache = args.cache_config()?;
    let source = YahooScreenerSource::new(args.screener_config()?);

    info!(
        ttl_secs = cache.ttl.as_secs(),
        eviction_interval_secs = cache.eviction_interval.as_secs(),
        fetch_timeout_secs = cache.fetch_timeout.as_secs(),
        "Starting region-stocks"
    );

    server::run(&config, &cache, Box::new(source), shutdown_signal()).await
}
