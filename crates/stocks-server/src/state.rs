//! Shared handler state

use std::sync::Arc;
use stocks_core::StockRetriever;

/// State handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<StockRetriever>,
}

impl AppState {
    pub fn new(retriever: Arc<StockRetriever>) -> Self {
        Self { retriever }
    }
}
