use serde::{Deserialize, Serialize};

/// The fields of an HTTP request covered by the signature.
///
/// `body` must be the exact serialized payload that goes on the wire.
/// Re-serializing the same JSON with other whitespace or key order yields a
/// different signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub method: String,
    pub path: String,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub body: String,
}

impl SignedRequest {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        timestamp_ms: i64,
        body: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            timestamp_ms,
            body: body.into(),
        }
    }

    /// Build the string fed to the HMAC: `METHOD|PATH|TIMESTAMP|BODY`.
    ///
    /// The method is upper-cased, nothing else is touched. An empty body
    /// still leaves the trailing separator in place.
    pub fn canonical_message(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.method.to_uppercase(),
            self.path,
            self.timestamp_ms,
            self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_message_layout() {
        let req = SignedRequest::new(
            "post",
            "/api/v1/upload/r2/signed-url",
            1704672000123,
            r#"{"filename":"photo.jpg"}"#,
        );

        assert_eq!(
            req.canonical_message(),
            r#"POST|/api/v1/upload/r2/signed-url|1704672000123|{"filename":"photo.jpg"}"#
        );
    }

    #[test]
    fn test_empty_body_keeps_trailing_separator() {
        let req = SignedRequest::new("GET", "/api/v1/files", 1704672000123, "");
        let msg = req.canonical_message();

        assert_eq!(msg, "GET|/api/v1/files|1704672000123|");
        assert!(msg.ends_with('|'));
    }

    #[test]
    fn test_path_is_not_normalized() {
        let with_slash = SignedRequest::new("GET", "/api/v1/files/", 1, "");
        let without_slash = SignedRequest::new("GET", "/api/v1/files", 1, "");

        assert_ne!(with_slash.canonical_message(), without_slash.canonical_message());
    }

    #[test]
    fn test_body_defaults_to_empty_when_deserialized() {
        let req: SignedRequest =
            serde_json::from_str(r#"{"method":"GET","path":"/x","timestamp_ms":5}"#).unwrap();
        assert_eq!(req.body, "");
        assert_eq!(req.canonical_message(), "GET|/x|5|");
    }
}
