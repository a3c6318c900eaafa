use super::{CacheStore, chrono_ttl};
use crate::error::{Result, StocksError};
use crate::model::{CacheEntry, RegionKey, StockListing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS stock_info (
        region TEXT PRIMARY KEY NOT NULL,
        content TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );
";

/// Cache store persisted in a single SQLite table
///
/// Rows hold the region key, the listing as JSON and the insertion time in
/// Unix milliseconds. All statements run on the blocking thread pool behind
/// one connection mutex.
#[derive(Clone)]
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCacheStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StocksError::CacheError(format!("Failed to open database: {e}")))?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StocksError::CacheError(format!("Lock error: {e}")))?;
            op(&conn).map_err(StocksError::from)
        })
        .await
        .map_err(|e| StocksError::CacheError(format!("Blocking task failed: {e}")))?
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn init_schema(&self) -> Result<()> {
        self.run(|conn| conn.execute_batch(CREATE_TABLE)).await
    }

    async fn get(&self, region: &RegionKey) -> Result<Option<CacheEntry>> {
        let key = region.as_str().to_string();
        let row = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT content, timestamp FROM stock_info WHERE region = ?1",
                    params![key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()
            })
            .await?;

        let Some((content, millis)) = row else {
            return Ok(None);
        };

        let content: StockListing = serde_json::from_str(&content)?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            StocksError::CacheError(format!("Invalid timestamp {millis} for '{region}'"))
        })?;

        Ok(Some(CacheEntry::with_timestamp(region.clone(), content, timestamp)))
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let content = serde_json::to_string(&entry.content)?;
        let region = String::from(entry.region);
        let millis = entry.timestamp.timestamp_millis();

        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO stock_info (region, content, timestamp) VALUES (?1, ?2, ?3)",
                params![region, content, millis],
            )
            .map(|_| ())
        })
        .await
    }

    async fn delete_expired(&self, ttl: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - chrono_ttl(ttl)?).timestamp_millis();
        self.run(move |conn| {
            conn.execute("DELETE FROM stock_info WHERE timestamp < ?1", params![cutoff])
        })
        .await
    }

    async fn delete_all(&self) -> Result<()> {
        self.run(|conn| conn.execute_batch("DROP TABLE IF EXISTS stock_info;")).await
    }

    async fn len(&self) -> Result<usize> {
        self.run(|conn| {
            conn.query_row("SELECT COUNT(*) FROM stock_info", [], |row| row.get::<_, i64>(0))
        })
        .await
        .map(|count| count as usize)
    }
}
