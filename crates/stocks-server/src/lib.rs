//! HTTP front end for region-stocks
//!
//! Exposes `POST /stocks` (body `{"region": "<name>"}`) answering with the
//! symbol → {symbol, name, price} listing for that region, and a `GET
//! /health` liveness probe. [`server::run`] wires the cache store, the
//! retriever, the eviction loop and the listener together.

pub mod routes;
pub mod server;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
