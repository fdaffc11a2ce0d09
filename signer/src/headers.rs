//! Wire headers of a signed request.

use serde::Serialize;

use crate::error::AuthError;

pub const X_API_KEY: &str = "X-API-Key";
pub const X_SIGNATURE: &str = "X-Signature";
pub const X_TIMESTAMP: &str = "X-Timestamp";

/// Shown in some documentation samples. Never sent; stripped by the proxy.
pub const X_API_SECRET: &str = "X-API-Secret";

/// The three authentic headers attached to a signed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp_ms: i64,
}

impl SignatureHeaders {
    /// Header name/value pairs in the order they are usually sent.
    pub fn to_pairs(&self) -> [(&'static str, String); 3] {
        [
            (X_API_KEY, self.api_key.clone()),
            (X_SIGNATURE, self.signature.clone()),
            (X_TIMESTAMP, self.timestamp_ms.to_string()),
        ]
    }

    /// Read the headers through a lookup function.
    ///
    /// `get` receives the canonical header name; callers backed by a
    /// case-insensitive map (such as `http::HeaderMap`) can pass it straight
    /// through.
    pub fn from_lookup<'a, F>(get: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let api_key = get(X_API_KEY)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingHeader(X_API_KEY))?;

        let signature = get(X_SIGNATURE)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingHeader(X_SIGNATURE))?;

        let raw_timestamp = get(X_TIMESTAMP)
            .map(str::trim)
            .ok_or(AuthError::MissingHeader(X_TIMESTAMP))?;

        let timestamp_ms = parse_timestamp(raw_timestamp)
            .ok_or_else(|| AuthError::InvalidTimestamp(raw_timestamp.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            signature: signature.to_string(),
            timestamp_ms,
        })
    }
}

/// Accept only plain decimal digits that read back identically, so the
/// signed text and the rebuilt canonical message cannot diverge.
fn parse_timestamp(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = raw.parse::<i64>().ok()?;
    (value.to_string() == raw).then_some(value)
}

/// Drop the query string from a request target. Only the path is signed.
pub fn request_path(path_and_query: &str) -> &str {
    match path_and_query.split_once('?') {
        Some((path, _)) => path,
        None => path_and_query,
    }
}
