use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::web::{error::AppError, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateTier {
    /// Credential endpoints.
    Strict,
    /// Public forms that notify staff or touch payments.
    Moderate,
    Default,
}

impl RateTier {
    pub fn max_requests(self) -> u32 {
        match self {
            RateTier::Strict => 5,
            RateTier::Moderate => 10,
            RateTier::Default => 100,
        }
    }

    pub fn window(self) -> Duration {
        match self {
            RateTier::Strict => Duration::from_secs(15 * 60),
            RateTier::Moderate | RateTier::Default => Duration::from_secs(60),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            RateTier::Strict => "strict",
            RateTier::Moderate => "moderate",
            RateTier::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the window resets. Zero when allowed.
    pub retry_after: u64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counters per (tier, client ip). Process-local.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<(RateTier, String), Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, tier: RateTier, ip: &str) -> RateDecision {
        self.check_at(tier, ip, Instant::now())
    }

    fn check_at(&self, tier: RateTier, ip: &str, now: Instant) -> RateDecision {
        let max = tier.max_requests();
        let window = tier.window();

        // The entry guard holds the shard lock, so read-modify-write is atomic per key.
        let mut entry = self
            .windows
            .entry((tier, ip.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count += 1;

        if entry.count > max {
            let elapsed = now.duration_since(entry.started);
            let remaining_window = window.saturating_sub(elapsed);
            RateDecision {
                allowed: false,
                remaining: 0,
                retry_after: remaining_window.as_secs_f64().ceil().max(1.0) as u64,
            }
        } else {
            RateDecision {
                allowed: true,
                remaining: max - entry.count,
                retry_after: 0,
            }
        }
    }

    /// Drops windows that have expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|(tier, _), window| now.duration_since(window.started) < tier.window());
        before - self.windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(
    app_state: &AppState,
    tier: RateTier,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(req.headers(), peer);

    let decision = app_state.rate_limiter.check(tier, &ip);
    if !decision.allowed {
        warn!(ip = %ip, tier = tier.as_str(), path = %req.uri().path(), "Rate limit exceeded.");
        return Err(AppError::RateLimited {
            retry_after: decision.retry_after,
        });
    }
    debug!(ip = %ip, tier = tier.as_str(), remaining = decision.remaining, "Rate limit check passed.");
    Ok(next.run(req).await)
}

pub async fn strict(
    State(app_state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&app_state, RateTier::Strict, req, next).await
}

pub async fn moderate(
    State(app_state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&app_state, RateTier::Moderate, req, next).await
}

pub async fn default(
    State(app_state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&app_state, RateTier::Default, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_nth_request_over_limit_is_rejected() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for i in 1..=5 {
            let decision = limiter.check_at(RateTier::Strict, "10.0.0.1", now);
            assert!(decision.allowed, "request {i} should pass");
            assert_eq!(decision.remaining, 5 - i);
        }
        let rejected = limiter.check_at(RateTier::Strict, "10.0.0.1", now + Duration::from_secs(60));
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after, 14 * 60);

        // Other clients and tiers keep their own windows.
        assert!(limiter.check_at(RateTier::Strict, "10.0.0.2", now).allowed);
        assert!(limiter.check_at(RateTier::Default, "10.0.0.1", now).allowed);
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..11 {
            limiter.check_at(RateTier::Moderate, "ip", now);
        }
        assert!(!limiter.check_at(RateTier::Moderate, "ip", now).allowed);
        let later = now + Duration::from_secs(61);
        let decision = limiter.check_at(RateTier::Moderate, "ip", later);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[test]
    fn test_sweep_drops_expired_windows() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        limiter.check_at(RateTier::Default, "a", now);
        limiter.check_at(RateTier::Strict, "a", now);
        assert_eq!(limiter.sweep_at(now + Duration::from_secs(120)), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.sweep_at(now + Duration::from_secs(16 * 60)), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "192.168.0.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, None), "unknown");
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.0.9");

        headers.insert("x-real-ip", HeaderValue::from_static("172.16.0.3"));
        assert_eq!(client_ip(&headers, Some(peer)), "172.16.0.3");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");
    }
}
