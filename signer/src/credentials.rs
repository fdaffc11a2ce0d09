//! API credential pair.
//!
//! The api key identifies the account and travels with every request. The
//! secret is only used as the HMAC key and must never be sent or logged.

use crate::error::AuthError;

/// An ObitoX API credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    api_key: String,
    api_secret: String,
}

impl Credential {
    /// Load the credential from `OBITOX_API_KEY` and `OBITOX_API_SECRET`.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("OBITOX_API_KEY")
            .map_err(|_| AuthError::MissingEnvVar("OBITOX_API_KEY".into()))?;

        let api_secret = std::env::var("OBITOX_API_SECRET")
            .map_err(|_| AuthError::MissingEnvVar("OBITOX_API_SECRET".into()))?;

        Ok(Self::new(api_key, api_secret))
    }

    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// The api key (public, safe to log).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Expose the signing secret.
    ///
    /// Only for feeding the HMAC. Never log or transmit the return value.
    pub fn expose_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}
