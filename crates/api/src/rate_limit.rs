use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::AppState;

/// Fixed-window request counter per client IP.
///
/// Policy carried over from the original deployment: 100 requests per
/// 15-minute window across all `/api` routes. Windows reset lazily on the
/// first request after expiry; state is in-process only.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, WindowState>>,
}

struct WindowState {
    started_at: DateTime<Utc>,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::seconds(window_secs as i64),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `client` at `now`; false means over budget.
    pub fn check(&self, client: IpAddr, now: DateTime<Utc>) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = windows.entry(client).or_insert(WindowState {
            started_at: now,
            count: 0,
        });
        if now - entry.started_at >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }
        entry.count += 1;
        entry.count <= self.max_requests
    }
}

/// Client identity: first `x-forwarded-for` hop when present (we sit behind
/// a reverse proxy in production), else the socket address.
fn client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return ip;
            }
        }
    }
    req.extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ci| ci.0.ip())
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(&req);
    if state.rate_limiter.check(client, Utc::now()) {
        next.run(req).await
    } else {
        metrics::counter!("rugwatch_rate_limited_total").increment(1);
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": "Too many requests, please try again later."
            })),
        )
            .into_response()
    }
}
