use anyhow::{Context, Result};
use obitox_signer::Credential;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: Credential,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p).with_context(|| format!("Cannot read config file {p}"))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::build_from_env()
    }

    fn build_from_env() -> Result<Self> {
        let credential = Credential::from_env()
            .context("OBITOX_API_KEY and OBITOX_API_SECRET are required")?;

        Ok(Self {
            credential,
            api_base: env("OBITOX_API_BASE", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: env("OBITOX_TIMEOUT_SECS", "30")
                .parse()
                .context("OBITOX_TIMEOUT_SECS must be a valid u64")?,
        })
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
