use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

/// Handler for `GET /healthz` — liveness probe. Answers as long as the
/// process is up; it deliberately checks nothing else.
pub async fn healthz() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Handler for `GET /readyz` — readiness probe. Services that gate readiness
/// on their backends register their own handler instead.
pub async fn readyz() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}
