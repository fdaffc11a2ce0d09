use axum::Json;
use serde_json::{json, Value};

/// GET /api/health
///
/// Returns a simple status check with the proxy version. No signature needed.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
