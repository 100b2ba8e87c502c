use std::sync::atomic::Ordering;

use axum::{Json, extract::State, http::StatusCode};
use lbb_common::db::ping;
use lbb_metrics::render_metrics;
use serde_json::{Value, json};
use tokio::time::{Duration, timeout};

use crate::SharedState;
use crate::error::ApiError;

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn livez() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics() -> Result<String, StatusCode> {
    render_metrics().ok_or(StatusCode::NOT_FOUND)
}

/// Ready once the office store answers; flips to 503 as soon as shutdown starts.
pub async fn readyz(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    if !state.readiness.load(Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    let client = timeout(READINESS_TIMEOUT, state.pool.get())
        .await
        .map_err(|_| ApiError::ServiceUnavailable("db_pool_timeout".into()))?
        .map_err(|err| ApiError::ServiceUnavailable(format!("pool checkout failed: {err}")))?;

    timeout(READINESS_TIMEOUT, ping(&client))
        .await
        .map_err(|_| ApiError::ServiceUnavailable("db_ping_timeout".into()))?
        .map_err(|err| ApiError::ServiceUnavailable(format!("db ping failed: {err}")))?;

    Ok(Json(json!({
        "status": "ok",
        "database": "ok",
        "index": state.fetcher.index_name(),
        "occupations": state.fetcher.taxonomy().len(),
        "application": env!("CARGO_PKG_NAME"),
    })))
}
