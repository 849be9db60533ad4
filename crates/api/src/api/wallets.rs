use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use registry::store::ListQuery;
use registry::types::{NewReport, ReportStatus, VerifyUpdate};

use crate::api::{ApiError, AppState};

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// GET /api/wallets — the public feed. Defaults: verified, 50, risk
/// score descending.
pub async fn list_wallets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut query = ListQuery::default();
    if let Some(raw) = params.status.as_deref() {
        match ReportStatus::from_str_loose(raw) {
            Some(status) => query.status = status,
            // An unknown status matches nothing; not an error, same as the
            // original's pass-through filter.
            None => return Ok(Json(json!({ "success": true, "count": 0, "data": [] }))),
        }
    }
    if let Some(limit) = params.limit {
        query.limit = limit;
    }
    if let Some(sort) = params.sort {
        query.sort = sort;
    }

    let reports = state.store.list(query).await?;
    Ok(Json(
        json!({ "success": true, "count": reports.len(), "data": reports }),
    ))
}

/// GET /api/wallets/{address} — exact lookup, deactivated cases included.
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.store.get_by_address(&address).await?;
    Ok(Json(json!({ "success": true, "data": report })))
}

/// POST /api/wallets — submit a report. 201 for a new case, 200 when the
/// submission lands on an existing one.
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
    let (report, created) = state.store.submit(payload).await?;
    metrics::counter!("rugwatch_reports_submitted_total").increment(1);

    let (status, message) = if created {
        (StatusCode::CREATED, "Report submitted for review")
    } else {
        metrics::counter!("rugwatch_duplicate_reports_total").increment(1);
        (StatusCode::OK, "Report added to existing case")
    };
    Ok((
        status,
        Json(json!({ "success": true, "message": message, "data": report })),
    ))
}

/// PATCH /api/wallets/{id}/verify — moderation. Merges the supplied fields
/// and recomputes the risk score.
pub async fn verify_wallet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<VerifyUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.store.verify(id, update).await?;
    metrics::counter!("rugwatch_reports_verified_total").increment(1);
    Ok(Json(json!({
        "success": true,
        "message": "Wallet verified successfully",
        "data": report
    })))
}

/// DELETE /api/wallets/{id} — soft delete.
pub async fn deactivate_wallet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.store.deactivate(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Wallet deactivated",
        "data": report
    })))
}
