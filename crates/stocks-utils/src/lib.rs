//! Shared utilities for region-stocks
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and the process-level server configuration.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ServerConfig};
pub use logging::init_tracing;
