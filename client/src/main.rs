mod api;
mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use obitox_signer::{now_millis, request_path, verify, RequestSigner, SignedRequest};
use reqwest::Method;
use tracing::info;

use crate::api::ApiClient;
use crate::config::ClientConfig;

#[derive(Parser)]
#[command(name = "obitox", about = "Sign, verify and send ObitoX API requests")]
struct Cli {
    /// Load credentials from a specific .env file
    #[arg(long, global = true)]
    config_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the signature headers for a request
    Sign {
        #[command(flatten)]
        request: RequestArgs,

        /// Sign as of this Unix time in milliseconds instead of now
        #[arg(long)]
        timestamp: Option<i64>,

        /// Print the headers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a signature offline against the configured secret
    Verify {
        #[command(flatten)]
        request: RequestArgs,

        /// X-Timestamp value of the request
        #[arg(long)]
        timestamp: i64,

        /// X-Signature value of the request
        #[arg(long)]
        signature: String,

        /// Verifier clock in Unix milliseconds (defaults to now)
        #[arg(long)]
        now: Option<i64>,
    },
    /// Sign a request with the current time and send it
    Send {
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    method: String,

    /// Request path, e.g. /api/v1/upload/r2/signed-url
    #[arg(long, value_parser = parse_path)]
    path: String,

    /// Exact request body
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the exact request body from a file
    #[arg(long)]
    body_file: Option<String>,
}

/// Paths are appended to the API base as-is, so they must be absolute.
fn parse_path(raw: &str) -> Result<String, String> {
    if raw.starts_with('/') {
        Ok(raw.to_string())
    } else {
        Err(format!("path must start with '/', e.g. /{raw}"))
    }
}

impl RequestArgs {
    fn body(&self) -> Result<String> {
        match (&self.body, &self.body_file) {
            (Some(body), _) => Ok(body.clone()),
            (None, Some(path)) => {
                std::fs::read_to_string(path).with_context(|| format!("Cannot read body file {path}"))
            }
            (None, None) => Ok(String::new()),
        }
    }

    fn method(&self) -> Result<Method> {
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", self.method))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = ClientConfig::from_env_file(cli.config_file.as_deref())?;

    match cli.command {
        Command::Sign {
            request,
            timestamp,
            json,
        } => {
            let method = request.method()?;
            let body = request.body()?;
            let signer = RequestSigner::new(&cfg.credential);
            let headers = signer.sign_at(
                method.as_str(),
                request_path(&request.path),
                &body,
                timestamp.unwrap_or_else(now_millis),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&headers)?);
            } else {
                for (name, value) in headers.to_pairs() {
                    println!("{name}: {value}");
                }
            }
        }
        Command::Verify {
            request,
            timestamp,
            signature,
            now,
        } => {
            let method = request.method()?;
            let signed = SignedRequest::new(
                method.as_str(),
                request_path(&request.path),
                timestamp,
                request.body()?,
            );
            let now = now.unwrap_or_else(now_millis);

            match verify(&signed, &signature, cfg.credential.expose_secret(), now) {
                Ok(()) => println!("ok"),
                Err(e) => {
                    println!("{}", e.to_string().to_lowercase());
                    std::process::exit(1);
                }
            }
        }
        Command::Send { request } => {
            let method = request.method()?;
            let body = request.body()?;
            let client = ApiClient::new(&cfg.api_base, cfg.credential.clone(), cfg.timeout_secs)?;

            info!("{} {}{}", method, cfg.api_base, request.path);
            let resp = client.send(method, &request.path, body).await?;

            println!("HTTP {}", resp.status);
            println!("{}", resp.body);
            if resp.status >= 400 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_rejected() {
        let parsed = Cli::try_parse_from(["obitox", "send", "--path", "api/v1/files"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_absolute_path_with_query_accepted() {
        let cli = Cli::try_parse_from([
            "obitox",
            "sign",
            "-X",
            "post",
            "--path",
            "/api/v1/files?limit=5",
        ])
        .unwrap();

        match cli.command {
            Command::Sign { request, .. } => {
                assert_eq!(request.path, "/api/v1/files?limit=5");
                assert_eq!(request.method().unwrap(), Method::POST);
            }
            _ => panic!("expected sign"),
        }
    }
}
