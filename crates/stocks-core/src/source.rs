//! Data source contract
//!
//! A data source turns a region key into the complete table of stocks listed
//! for it. Pagination, session handling and readiness waits are internal to
//! the implementation; the retriever only sees one call per fetch and a
//! deadline around it.

use crate::error::{InvalidRegionKind, StocksError};
use crate::model::{RegionKey, SourceTable};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a data source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Region unknown to the source, or ambiguous
    #[error("Region not found: {0}")]
    RegionNotFound(String),

    /// The source gave up waiting on its backend
    #[error("Source timed out: {0}")]
    Timeout(String),

    /// Backend down, refused the request or answered with garbage
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Whether the session may be left in an indeterminate state
    pub fn needs_reset(&self) -> bool {
        !matches!(self, Self::RegionNotFound(_))
    }
}

impl From<SourceError> for StocksError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::RegionNotFound(region) => StocksError::InvalidRegion {
                region,
                kind: InvalidRegionKind::NotRecognized,
            },
            SourceError::Timeout(msg) => StocksError::SourceTimeout(msg),
            SourceError::Unavailable(msg) => StocksError::SourceUnavailable(msg),
        }
    }
}

/// Stateful, serially reused provider of region tables
///
/// The retriever owns exactly one source and never calls it from two tasks
/// at once, so implementations may keep session state in `&mut self`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send {
    /// Collect every row listed for `region`
    async fn fetch(&mut self, region: &RegionKey) -> Result<SourceTable, SourceError>;

    /// Discard session state after a failed or abandoned fetch
    async fn reset(&mut self);
}
