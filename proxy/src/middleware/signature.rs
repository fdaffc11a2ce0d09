use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use obitox_signer::{now_millis, verify_with_tolerance, SignatureHeaders, SignedRequest};
use serde_json::json;
use tracing::{debug, warn};

use crate::AppState;

/// Stands in for the secret of an api key that is not configured.
const UNKNOWN_KEY_SECRET: &str = "obitox-proxy-unknown-api-key";

/// Api key of a request whose signature checked out, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedKey(pub String);

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

fn key_prefix(api_key: &str) -> &str {
    api_key.get(..8).unwrap_or(api_key)
}

/// Authenticate a signed request.
///
/// Reads `X-API-Key`, `X-Signature` and `X-Timestamp`, buffers the body and
/// checks the HMAC over `METHOD|PATH|TIMESTAMP|BODY`. Every failure gives the
/// same 401 response. On success the body is passed on untouched.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let headers = match signature_headers(request.headers()) {
        Ok(h) => h,
        Err(e) => {
            debug!("Rejecting request without usable signature headers: {}", e);
            return unauthorized();
        }
    };

    // Unknown keys go through the same buffering and HMAC work as known ones
    let credential = state.credentials.get(&headers.api_key);
    let secret = credential
        .map(|c| c.expose_secret())
        .unwrap_or(UNKNOWN_KEY_SECRET);

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => {
            warn!("Could not buffer request body: {}", e);
            return unauthorized();
        }
    };

    let Ok(body_str) = std::str::from_utf8(&bytes) else {
        debug!("Request body is not UTF-8");
        return unauthorized();
    };

    let signed = SignedRequest::new(
        parts.method.as_str(),
        parts.uri.path(),
        headers.timestamp_ms,
        body_str,
    );

    let verified = verify_with_tolerance(
        &signed,
        &headers.signature,
        secret,
        now_millis(),
        state.signature_tolerance_ms,
    )
    .is_ok();

    if credential.is_none() {
        warn!("Unknown api key {}...", key_prefix(&headers.api_key));
        return unauthorized();
    }

    if !verified {
        warn!(
            "Invalid signature from api key {}... on {} {}",
            key_prefix(&headers.api_key),
            parts.method,
            parts.uri.path()
        );
        return unauthorized();
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(VerifiedKey(headers.api_key));
    next.run(request).await
}

fn signature_headers(headers: &HeaderMap) -> Result<SignatureHeaders, obitox_signer::AuthError> {
    SignatureHeaders::from_lookup(|name| headers.get(name).and_then(|v| v.to_str().ok()))
}
