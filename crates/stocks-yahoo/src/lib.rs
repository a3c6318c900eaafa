//! Yahoo Finance screener data source
//!
//! [`YahooScreenerSource`] implements [`stocks_core::DataSource`] on top of
//! the Yahoo Finance equity screener API:
//!
//! - region names are matched against the screener's country list
//!   ([`regions::lookup`]); unknown and ambiguous names are rejected
//! - a session (cookies + crumb) is opened lazily and reused until reset
//! - results are read page by page, paced by a rate limiter, each request
//!   retried a bounded number of times
//!
//! Prices and other figures are kept as the screener formats them.

pub mod config;
pub mod regions;
pub mod retry;
pub mod screener;
pub mod wire;

pub use config::ScreenerConfig;
pub use screener::YahooScreenerSource;
