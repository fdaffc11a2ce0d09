use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use obitox_signer::{Credential, DEFAULT_TOLERANCE_MS};

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub upstream_url: String,
    pub credentials: HashMap<String, Credential>,
    pub port: u16,
    pub signature_tolerance_ms: u64,
    pub max_body_bytes: usize,
    pub max_requests_per_ip_per_minute: u32,
    pub upstream_timeout_secs: u64,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            upstream_url: std::env::var("UPSTREAM_URL")
                .context("UPSTREAM_URL is required")?
                .trim_end_matches('/')
                .to_string(),
            credentials: parse_credentials(
                &std::env::var("API_CREDENTIALS").context("API_CREDENTIALS is required")?,
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
            signature_tolerance_ms: std::env::var("SIGNATURE_TOLERANCE_MS")
                .unwrap_or_else(|_| DEFAULT_TOLERANCE_MS.to_string())
                .parse()
                .context("SIGNATURE_TOLERANCE_MS must be a valid u64")?,
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| "10485760".to_string())
                .parse()
                .context("MAX_BODY_BYTES must be a valid usize")?,
            max_requests_per_ip_per_minute: std::env::var("MAX_REQUESTS_PER_IP_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("MAX_REQUESTS_PER_IP_PER_MINUTE must be a valid u32")?,
            upstream_timeout_secs: std::env::var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("UPSTREAM_TIMEOUT_SECS must be a valid u64")?,
        })
    }
}

/// Parse `key:secret[,key:secret...]` into a lookup table keyed by api key.
pub fn parse_credentials(raw: &str) -> Result<HashMap<String, Credential>> {
    let mut credentials = HashMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((key, secret)) = entry.split_once(':') else {
            bail!("API_CREDENTIALS entry must be key:secret");
        };
        let (key, secret) = (key.trim(), secret.trim());
        if key.is_empty() || secret.is_empty() {
            bail!("API_CREDENTIALS entry has an empty key or secret");
        }
        if credentials
            .insert(key.to_string(), Credential::new(key, secret))
            .is_some()
        {
            bail!("API_CREDENTIALS lists api key {key} twice");
        }
    }

    if credentials.is_empty() {
        bail!("API_CREDENTIALS must contain at least one key:secret pair");
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let creds = parse_credentials("ox_a:secret_a, ox_b:secret:with:colons").unwrap();

        assert_eq!(creds.len(), 2);
        assert_eq!(creds["ox_a"].expose_secret(), "secret_a");
        assert_eq!(creds["ox_b"].expose_secret(), "secret:with:colons");
    }

    #[test]
    fn test_parse_credentials_rejects_malformed() {
        assert!(parse_credentials("").is_err());
        assert!(parse_credentials("no_separator").is_err());
        assert!(parse_credentials("ox_a:").is_err());
        assert!(parse_credentials(":secret").is_err());
        assert!(parse_credentials("ox_a:one,ox_a:two").is_err());
    }

    #[test]
    fn test_parse_error_does_not_echo_secret() {
        let err = parse_credentials("ox_a:first_secret,ox_a:second_secret")
            .unwrap_err()
            .to_string();
        assert!(err.contains("ox_a"));
        assert!(!err.contains("first_secret"));
        assert!(!err.contains("second_secret"));
    }
}
