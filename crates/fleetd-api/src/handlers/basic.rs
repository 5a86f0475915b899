//! Health endpoints.

use axum::response::Json;
use serde_json::json;

/// Public liveness check.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fleetd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
