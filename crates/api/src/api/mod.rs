pub mod stats;
pub mod wallets;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use registry::error::RegistryError;
use registry::store::ReportStore;

use crate::rate_limit::{rate_limit_middleware, RateLimiter};

/// Shared application state available to all handlers.
pub struct AppState {
    pub store: ReportStore,
    pub rate_limiter: RateLimiter,
    /// None in tests (a global recorder can only be installed once per process).
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    // Everything under /api shares the per-client rate limit, the health
    // check included (the original deployment limited the whole prefix).
    let api_routes = Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/wallets",
            get(wallets::list_wallets).post(wallets::submit_report),
        )
        .route("/api/wallets/stats/summary", get(stats::summary))
        // GET takes the wallet address, DELETE the internal id; same slot
        .route(
            "/api/wallets/{id}",
            get(wallets::get_wallet).delete(wallets::deactivate_wallet),
        )
        .route(
            "/api/wallets/{id}/verify",
            axum::routing::patch(wallets::verify_wallet),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(api_routes)
        .route("/metrics", get(metrics_endpoint))
        // Public API consumed by a separate frontend: any origin may read
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Maps the store's error taxonomy onto the wire envelope. Validation
/// failures and unknown keys carry a `message`; everything else surfaces
/// the raw error text under `error` with a 500.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidAddress(_) => {
                Self::BadRequest("Invalid Solana wallet address".to_string())
            }
            RegistryError::NotFound(_) => Self::NotFound("Wallet not found".to_string()),
            RegistryError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": message }),
            ),
            Self::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": error }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK", "timestamp": chrono::Utc::now() }))
}

async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> String {
    match &state.metrics {
        Some(handle) => {
            handle.run_upkeep();
            handle.render()
        }
        None => String::new(),
    }
}
