//! Request signing for the ObitoX upload API.
//!
//! Every authenticated call carries an HMAC-SHA256 signature over the
//! canonical message `METHOD|PATH|TIMESTAMP|BODY`, keyed by the secret of an
//! API credential. The recipient recomputes the signature, compares it in
//! constant time and rejects requests whose timestamp is more than five
//! minutes away from its own clock.
//!
//! # Example
//!
//! ```rust,ignore
//! use obitox_signer::{Credential, RequestSigner};
//!
//! let credential = Credential::from_env()?;
//! let signer = RequestSigner::new(&credential);
//!
//! let headers = signer.sign_now("POST", "/api/v1/upload/r2/signed-url", r#"{"filename":"photo.jpg"}"#);
//! for (name, value) in headers.to_pairs() {
//!     println!("{name}: {value}");
//! }
//! ```

mod credentials;
mod error;
mod headers;
mod request;
mod signature;

pub use credentials::Credential;
pub use error::AuthError;
pub use headers::{
    request_path, SignatureHeaders, X_API_KEY, X_API_SECRET, X_SIGNATURE, X_TIMESTAMP,
};
pub use request::SignedRequest;
pub use signature::{
    now_millis, sign, verify, verify_with_tolerance, RequestSigner, DEFAULT_TOLERANCE_MS,
};
