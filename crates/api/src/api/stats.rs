use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use serde_json::json;

use crate::api::{ApiError, AppState};

/// GET /api/wallets/stats/summary — dashboard aggregates over active rows.
pub async fn summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.store.summary_stats().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
