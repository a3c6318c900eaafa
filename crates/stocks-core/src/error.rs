//! Error types for region stock retrieval

use std::fmt;
use thiserror::Error;

/// Why a region was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRegionKind {
    /// Nothing left after trimming the input
    Empty,
    /// The data source did not recognize the region (or matched several)
    NotRecognized,
}

impl fmt::Display for InvalidRegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("region is empty"),
            Self::NotRecognized => f.write_str("region not recognized"),
        }
    }
}

/// Errors surfaced by the retrieval core
#[derive(Debug, Error)]
pub enum StocksError {
    /// Empty input, or a region the data source does not know
    #[error("Invalid region '{region}': {kind}")]
    InvalidRegion {
        region: String,
        kind: InvalidRegionKind,
    },

    /// The source returned a table without the expected shape
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    /// The source did not answer before the fetch deadline
    #[error("Data source timed out: {0}")]
    SourceTimeout(String),

    /// The source is down or answered with garbage
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    /// Cache store I/O failure
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StocksError {
    /// Shorthand for an empty-region rejection
    pub fn empty_region(region: impl Into<String>) -> Self {
        Self::InvalidRegion {
            region: region.into(),
            kind: InvalidRegionKind::Empty,
        }
    }

    /// Whether a client may reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceTimeout(_) | Self::SourceUnavailable(_))
    }
}

impl From<rusqlite::Error> for StocksError {
    fn from(err: rusqlite::Error) -> Self {
        StocksError::CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for StocksError {
    fn from(err: serde_json::Error) -> Self {
        StocksError::CacheError(format!("Corrupt cache content: {err}"))
    }
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, StocksError>;
