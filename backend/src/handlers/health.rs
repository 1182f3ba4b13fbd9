//! Health check endpoint

use axum::Json;
use serde_json::json;

/// API health check
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
