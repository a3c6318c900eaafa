//! Request handlers and status mapping

use crate::state::AppState;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use stocks_core::{InvalidRegionKind, StocksError};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Body returned when the request carries no usable `region`
pub const INVALID_KEY_MESSAGE: &str = "You request was sent with an invalid key.";
/// Body returned when the data source does not know the region
pub const UNKNOWN_REGION_MESSAGE: &str =
    "There is an error in your request. Please re-enter the desired region name.";

#[derive(Debug, Deserialize)]
pub struct StocksRequest {
    #[serde(default)]
    pub region: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stocks", post(get_stocks))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Retrieve the stocks listed in the requested region
async fn get_stocks(
    State(state): State<AppState>,
    payload: Result<Json<StocksRequest>, JsonRejection>,
) -> Response {
    let region = match payload {
        Ok(Json(StocksRequest {
            region: Some(region),
        })) => region,
        Ok(_) => return (StatusCode::BAD_REQUEST, INVALID_KEY_MESSAGE).into_response(),
        Err(rejection) => {
            warn!("Rejected /stocks body: {}", rejection);
            return (StatusCode::BAD_REQUEST, INVALID_KEY_MESSAGE).into_response();
        },
    };

    match state.retriever.resolve(&region).await {
        Ok(listing) => Json(listing).into_response(),
        Err(err) => error_response(&err),
    }
}

/// Map a retrieval error onto a status code and plain-text body
pub fn error_response(err: &StocksError) -> Response {
    match err {
        StocksError::InvalidRegion {
            kind: InvalidRegionKind::Empty,
            ..
        } => (StatusCode::BAD_REQUEST, INVALID_KEY_MESSAGE).into_response(),
        StocksError::InvalidRegion {
            kind: InvalidRegionKind::NotRecognized,
            ..
        } => (StatusCode::BAD_REQUEST, UNKNOWN_REGION_MESSAGE).into_response(),
        StocksError::SourceTimeout(_) | StocksError::SourceUnavailable(_) => {
            warn!("Data source failure: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
        },
        StocksError::MalformedTable(_)
        | StocksError::CacheError(_)
        | StocksError::ConfigError(_) => {
            error!("Request failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        },
    }
}
