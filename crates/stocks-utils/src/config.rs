//! Process-level configuration for the HTTP front end

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port
pub const DEFAULT_PORT: u16 = 5000;

/// Errors raised while resolving the server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Host/port pair does not form a socket address
    #[error("Invalid bind address {0}: {1}")]
    InvalidBindAddress(String, std::net::AddrParseError),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// SQLite file backing the cache; `None` keeps the cache in memory
    pub database_path: Option<PathBuf>,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_path: None,
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Socket address the front end listens on
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|e| ConfigError::InvalidBindAddress(raw, e))
    }
}
