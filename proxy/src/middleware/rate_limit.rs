use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::AppState;

/// Tracks per-IP request rates over a fixed one-minute window.
#[derive(Clone)]
pub struct RateLimiter {
    /// IP address -> (count, window_start)
    ip_minute: Arc<DashMap<String, (u32, DateTime<Utc>)>>,
    pub max_requests_per_ip_per_minute: u32,
}

impl RateLimiter {
    pub fn new(max_requests_per_ip_per_minute: u32) -> Self {
        Self {
            ip_minute: Arc::new(DashMap::new()),
            max_requests_per_ip_per_minute,
        }
    }

    /// Check if an IP address has exceeded the per-minute request limit.
    /// Returns Ok(current_count) or Err(message) if over limit.
    pub fn check_ip_limit(&self, ip: &str) -> Result<u32, String> {
        self.check_ip_limit_at(ip, Utc::now())
    }

    fn check_ip_limit_at(&self, ip: &str, now: DateTime<Utc>) -> Result<u32, String> {
        let mut entry = self.ip_minute.entry(ip.to_string()).or_insert((0, now));

        // Reset window if more than 60 seconds have passed
        if (now - entry.1).num_seconds() >= 60 {
            entry.0 = 0;
            entry.1 = now;
        }

        if entry.0 >= self.max_requests_per_ip_per_minute {
            return Err(format!(
                "IP has exceeded rate limit of {} requests/minute",
                self.max_requests_per_ip_per_minute
            ));
        }

        entry.0 += 1;
        Ok(entry.0)
    }

    /// Drop windows older than 2 minutes. Call this from a background task.
    pub fn cleanup_stale_entries(&self) {
        let now = Utc::now();
        self.ip_minute
            .retain(|_, (_, window_start)| (now - *window_start).num_seconds() < 120);
    }

    pub fn tracked_ips(&self) -> usize {
        self.ip_minute.len()
    }
}

/// Background task that periodically drops stale rate limiter windows.
pub async fn run_sweeper(rate_limiter: RateLimiter, interval_secs: u64) {
    let interval = std::time::Duration::from_secs(interval_secs);
    info!("Rate limiter sweeper started (interval: {}s)", interval_secs);

    loop {
        tokio::time::sleep(interval).await;
        rate_limiter.cleanup_stale_entries();
        debug!("Rate limiter tracking {} IPs", rate_limiter.tracked_ips());
    }
}

/// Reject requests from IPs over their per-minute budget with 429.
///
/// Requests without connection info (in-process tests) are not limited.
pub async fn limit_by_ip(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());

    if let Some(ip) = ip {
        if let Err(msg) = state.rate_limiter.check_ip_limit(&ip) {
            warn!("Rate limited {}: {}", ip, msg);
            return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": msg }))).into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ip_limit() {
        let limiter = RateLimiter::new(3);

        assert!(limiter.check_ip_limit("1.2.3.4").is_ok());
        assert!(limiter.check_ip_limit("1.2.3.4").is_ok());
        assert!(limiter.check_ip_limit("1.2.3.4").is_ok());
        // Fourth should fail
        assert!(limiter.check_ip_limit("1.2.3.4").is_err());

        // Different IP is fine
        assert!(limiter.check_ip_limit("5.6.7.8").is_ok());
    }

    #[test]
    fn test_window_resets_after_a_minute() {
        let limiter = RateLimiter::new(1);
        let start = Utc::now();

        assert!(limiter.check_ip_limit_at("1.2.3.4", start).is_ok());
        assert!(limiter
            .check_ip_limit_at("1.2.3.4", start + Duration::seconds(30))
            .is_err());
        assert_eq!(
            limiter.check_ip_limit_at("1.2.3.4", start + Duration::seconds(61)),
            Ok(1)
        );
    }

    #[test]
    fn test_cleanup_drops_old_windows() {
        let limiter = RateLimiter::new(10);
        let old = Utc::now() - Duration::minutes(5);

        limiter.check_ip_limit_at("1.2.3.4", old).unwrap();
        limiter.check_ip_limit("5.6.7.8").unwrap();
        assert_eq!(limiter.tracked_ips(), 2);

        limiter.cleanup_stale_entries();
        assert_eq!(limiter.tracked_ips(), 1);
    }
}
