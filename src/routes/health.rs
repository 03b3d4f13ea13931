//! # routes::health

use axum::{response::IntoResponse, Json};
use serde_json::json;

/// GET /health — liveness probe; never touches the pipeline.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "ok": true, "status": "healthy" }))
}
