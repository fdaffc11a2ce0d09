//! HMAC-SHA256 signing and verification of ObitoX requests.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::credentials::Credential;
use crate::error::AuthError;
use crate::headers::SignatureHeaders;
use crate::request::SignedRequest;

type HmacSha256 = Hmac<Sha256>;

/// Accepted distance between the request timestamp and the verifier's clock.
pub const DEFAULT_TOLERANCE_MS: u64 = 5 * 60 * 1000;

fn new_mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

fn hmac_hex(secret: &str, message: &str) -> String {
    let mut mac = new_mac(secret);
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sign a request and return the lowercase hex HMAC-SHA256 of its canonical
/// message. Deterministic: no nonce, no salt.
pub fn sign(request: &SignedRequest, secret: &str) -> String {
    hmac_hex(secret, &request.canonical_message())
}

/// Verify a request signature with the default five minute window.
pub fn verify(
    request: &SignedRequest,
    signature: &str,
    secret: &str,
    now_ms: i64,
) -> Result<(), AuthError> {
    verify_with_tolerance(request, signature, secret, now_ms, DEFAULT_TOLERANCE_MS)
}

/// Verify a request signature against `secret` at time `now_ms`.
///
/// The signature and the timestamp are checked independently and both must
/// pass. The caller only ever sees `AuthError::Unauthorized`.
pub fn verify_with_tolerance(
    request: &SignedRequest,
    signature: &str,
    secret: &str,
    now_ms: i64,
    tolerance_ms: u64,
) -> Result<(), AuthError> {
    let signature_ok = match hex::decode(signature.trim()) {
        Ok(claimed) => {
            let mut mac = new_mac(secret);
            mac.update(request.canonical_message().as_bytes());
            // verify_slice compares in constant time
            let ok = mac.verify_slice(&claimed).is_ok();
            if !ok {
                debug!(
                    "Signature mismatch for {} {}",
                    request.method.to_uppercase(),
                    request.path
                );
            }
            ok
        }
        Err(_) => {
            debug!("Signature is not valid hex");
            false
        }
    };

    let skew_ms = now_ms.abs_diff(request.timestamp_ms);
    let timestamp_ok = skew_ms <= tolerance_ms;
    if !timestamp_ok {
        warn!(
            "Request timestamp outside window: skew={}ms tolerance={}ms",
            skew_ms, tolerance_ms
        );
    }

    if signature_ok && timestamp_ok {
        Ok(())
    } else {
        Err(AuthError::Unauthorized)
    }
}

/// Signs outbound requests with a credential.
pub struct RequestSigner<'a> {
    credential: &'a Credential,
}

impl<'a> RequestSigner<'a> {
    pub fn new(credential: &'a Credential) -> Self {
        Self { credential }
    }

    /// Sign `method path body` as of `timestamp_ms` and return the headers to send.
    pub fn sign_at(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp_ms: i64,
    ) -> SignatureHeaders {
        let request = SignedRequest::new(method, path, timestamp_ms, body);
        SignatureHeaders {
            api_key: self.credential.api_key().to_string(),
            signature: sign(&request, self.credential.expose_secret()),
            timestamp_ms,
        }
    }

    /// Sign with the current clock.
    pub fn sign_now(&self, method: &str, path: &str, body: &str) -> SignatureHeaders {
        self.sign_at(method, path, body, now_millis())
    }
}
