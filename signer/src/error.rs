use thiserror::Error;

/// Errors that can occur while loading credentials or authenticating a request.
///
/// Every verification failure is reported as `Unauthorized`, whatever the
/// underlying cause; the cause only goes to the logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Signature mismatch or timestamp outside the accepted window.
    #[error("Unauthorized")]
    Unauthorized,

    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A required signature header is absent from the request.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// `X-Timestamp` is not a decimal number of milliseconds.
    #[error("Invalid timestamp header: {0}")]
    InvalidTimestamp(String),
}
