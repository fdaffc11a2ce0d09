use anyhow::{bail, Context, Result};
use obitox_signer::{request_path, Credential, RequestSigner, SignatureHeaders};
use reqwest::Method;
use tracing::{debug, warn};

/// Response of a signed call, kept raw so the CLI can print it as-is.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client for the ObitoX API that signs every request.
pub struct ApiClient {
    base_url: String,
    credential: Credential,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, credential: Credential, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .context("Build HTTP client")?,
        })
    }

    /// Sign `method path_and_query body` with the current time.
    ///
    /// Only the path part takes part in the signature.
    pub fn signature_headers(&self, method: &Method, path_and_query: &str, body: &str) -> SignatureHeaders {
        RequestSigner::new(&self.credential).sign_now(
            method.as_str(),
            request_path(path_and_query),
            body,
        )
    }

    /// Send a signed request. `body` is transmitted byte for byte as signed.
    pub async fn send(&self, method: Method, path_and_query: &str, body: String) -> Result<ApiResponse> {
        if !path_and_query.starts_with('/') {
            bail!("Request path must start with '/': {path_and_query}");
        }

        let url = format!("{}{}", self.base_url, path_and_query);
        let headers = self.signature_headers(&method, path_and_query, &body);

        debug!(
            "Signed {} {} (ts={})",
            method,
            request_path(path_and_query),
            headers.timestamp_ms
        );

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");

        for (name, value) in headers.to_pairs() {
            req = req.header(name, value);
        }

        if !body.is_empty() {
            req = req.header("Content-Type", "application/json").body(body);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{method} {url}"))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Request rejected as unauthorized; check credentials and clock, then re-sign");
        }

        let body = resp.text().await.context("Read response body")?;
        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obitox_signer::{verify, SignedRequest};

    #[test]
    fn test_signature_ignores_query_string() {
        let client = ApiClient::new(
            "http://localhost:8080/",
            Credential::new("ox_key", "ox_secret"),
            5,
        )
        .unwrap();

        let headers = client.signature_headers(&Method::GET, "/api/v1/files?limit=5", "");
        let req = SignedRequest::new("GET", "/api/v1/files", headers.timestamp_ms, "");

        assert_eq!(headers.api_key, "ox_key");
        assert!(verify(&req, &headers.signature, "ox_secret", headers.timestamp_ms).is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            ApiClient::new("https://api.example.test///", Credential::new("k", "s"), 5).unwrap();
        assert_eq!(client.base_url, "https://api.example.test");
    }

    #[tokio::test]
    async fn test_relative_path_not_sent() {
        // Nothing listens on port 9; the path check fails before any connect
        let client =
            ApiClient::new("http://127.0.0.1:9", Credential::new("k", "s"), 5).unwrap();

        let err = client
            .send(Method::GET, "api/v1/files", String::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }
}
