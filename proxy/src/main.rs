mod config;
mod middleware;
mod routes;
mod upstream;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use axum::Router;
use obitox_signer::Credential;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::ProxyConfig;
use crate::middleware::rate_limit::{limit_by_ip, RateLimiter};
use crate::middleware::signature::require_signature;
use crate::upstream::UpstreamClient;

/// Shared application state passed to all route handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<HashMap<String, Credential>>,
    pub signature_tolerance_ms: u64,
    pub max_body_bytes: usize,
    pub upstream: UpstreamClient,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            credentials: Arc::new(config.credentials.clone()),
            signature_tolerance_ms: config.signature_tolerance_ms,
            max_body_bytes: config.max_body_bytes,
            upstream: UpstreamClient::new(config)?,
            rate_limiter: RateLimiter::new(config.max_requests_per_ip_per_minute),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    // CORS layer: browsers call the upload API directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Everything under /api/v1 must carry a valid signature. The signature
    // middleware buffers the body up to MAX_BODY_BYTES, so axum's own 2 MB
    // extractor limit is lifted here.
    let signed = Router::new()
        .route("/api/v1/*rest", any(routes::forward::forward))
        .route_layer(from_fn_with_state(state.clone(), require_signature))
        .layer(DefaultBodyLimit::disable());

    Router::new()
        .route("/api/health", get(routes::health::health))
        .merge(signed)
        .layer(from_fn_with_state(state.clone(), limit_by_ip))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignored in production where env vars are set externally)
    let _ = dotenvy::dotenv();

    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ProxyConfig::from_env()?;
    info!(
        "Configuration loaded (port={}, upstream={}, keys={}, tolerance={}ms)",
        config.port,
        config.upstream_url,
        config.credentials.len(),
        config.signature_tolerance_ms
    );

    let state = AppState::new(&config)?;

    let sweeper_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        middleware::rate_limit::run_sweeper(sweeper_limiter, 60).await;
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("ObitoX proxy v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    info!("Routes:");
    info!("  GET  /api/health");
    info!("  ANY  /api/v1/*  (X-API-Key, X-Signature, X-Timestamp required)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
