use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use obitox_signer::X_API_SECRET;
use tracing::{debug, warn};

use crate::config::ProxyConfig;

/// Connection-scoped headers that must not cross the proxy. Content length is
/// recomputed from the buffered body on each side.
const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Response relayed back from the upstream API.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// HTTP client for the upload API behind the proxy.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.upstream_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    /// Forward a verified request and collect the upstream response.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse> {
        let url = self.url_for(path_and_query);
        debug!("Forwarding {} {}", method, url);

        let resp = self
            .http
            .request(method, &url)
            .headers(forwardable_headers(headers))
            .body(body)
            .send()
            .await
            .with_context(|| format!("Upstream request to {url}"))?;

        let status = resp.status();
        let headers = forwardable_headers(resp.headers());
        let body = resp.bytes().await.context("Read upstream response body")?;

        if status.is_server_error() {
            warn!("Upstream returned {} for {}", status, path_and_query);
        }

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Copy end-to-end headers, dropping hop-by-hop ones, anything named in
/// `Connection`, and `X-API-Secret`.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<String> = headers
        .get_all("connection")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    if headers.contains_key(X_API_SECRET) {
        warn!("Dropping {} header; secrets are never forwarded", X_API_SECRET);
    }

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_droppable(name, &connection_listed) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn is_droppable(name: &HeaderName, connection_listed: &[String]) -> bool {
    let name = name.as_str();
    HOP_BY_HOP.contains(&name)
        || name.eq_ignore_ascii_case(X_API_SECRET)
        || connection_listed.iter().any(|listed| listed == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwardable_headers_filtering() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", HeaderValue::from_static("ox_key"));
        headers.insert("x-signature", HeaderValue::from_static("abcd"));
        headers.insert("x-timestamp", HeaderValue::from_static("1704672000123"));
        headers.insert("x-api-secret", HeaderValue::from_static("leaked"));
        headers.insert("connection", HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("x-trace", HeaderValue::from_static("1"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("host", HeaderValue::from_static("proxy.local"));

        let out = forwardable_headers(&headers);

        assert_eq!(out.get("content-type").unwrap(), "application/json");
        assert_eq!(out.get("x-api-key").unwrap(), "ox_key");
        assert_eq!(out.get("x-signature").unwrap(), "abcd");
        assert_eq!(out.get("x-timestamp").unwrap(), "1704672000123");
        assert!(out.get("x-api-secret").is_none());
        assert!(out.get("connection").is_none());
        assert!(out.get("x-trace").is_none());
        assert!(out.get("transfer-encoding").is_none());
        assert!(out.get("host").is_none());
    }

    #[test]
    fn test_repeated_headers_kept() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.append("accept", HeaderValue::from_static("text/plain"));

        let out = forwardable_headers(&headers);
        assert_eq!(out.get_all("accept").iter().count(), 2);
    }
}
