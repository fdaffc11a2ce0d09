use axum::body::{Body, Bytes};
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use crate::middleware::signature::VerifiedKey;
use crate::AppState;

/// ANY /api/v1/*
///
/// Relays a request that already passed signature verification to the
/// upstream API, then relays the upstream answer back unchanged.
pub async fn forward(
    State(state): State<AppState>,
    Extension(VerifiedKey(api_key)): Extension<VerifiedKey>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    match state
        .upstream
        .forward(method.clone(), path_and_query, &headers, body)
        .await
    {
        Ok(upstream) => {
            info!(
                "{} {} by {}... -> {}",
                method,
                uri.path(),
                api_key.get(..8).unwrap_or(&api_key),
                upstream.status
            );

            let mut response = Response::new(Body::from(upstream.body));
            *response.status_mut() = upstream.status;
            *response.headers_mut() = upstream.headers;
            response
        }
        Err(e) => {
            warn!("Upstream unavailable: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Upstream unavailable" })),
            )
                .into_response()
        }
    }
}
