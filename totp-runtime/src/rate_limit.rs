//! Sliding-window rate limiting for the 2FA endpoints.
//!
//! A six-digit code with a three-step acceptance window can be guessed online
//! unless attempts are throttled, so `POST /verify-2fa` and
//! `POST /decrypt-seed` share a tight per-IP budget. `GET` endpoints get a
//! looser one.
//!
//! - `write_limiter()`: 30 req/min
//! - `read_limiter()`: 120 req/min
//!
//! Requests whose client address cannot be determined pass through.

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// Request timestamps for one client.
#[derive(Default)]
struct Bucket {
    hits: Vec<Instant>,
}

impl Bucket {
    fn admit(&mut self, now: Instant, window: Duration, max_requests: u32) -> bool {
        self.hits.retain(|t| now.duration_since(*t) < window);
        if self.hits.len() < max_requests as usize {
            self.hits.push(now);
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
    last_sweep: Mutex<Instant>,
}

/// Forget idle clients every 5 minutes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    /// Record a request from `ip`; false once its budget is spent.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        {
            let mut last_sweep = self.last_sweep.lock().unwrap_or_else(|e| e.into_inner());
            if now.duration_since(*last_sweep) >= SWEEP_INTERVAL {
                let window = self.window();
                buckets.retain(|_, b| b.hits.last().is_some_and(|t| now.duration_since(*t) < window));
                *last_sweep = now;
            }
        }

        buckets
            .entry(ip)
            .or_default()
            .admit(now, self.window(), self.config.max_requests)
    }

    /// Number of clients currently tracked.
    pub fn tracked_ips(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn reject(&self) -> Response {
        let retry_after = self.config.window_secs.to_string();
        tracing::warn!("Rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", retry_after)],
            "Rate limit exceeded",
        )
            .into_response()
    }
}

static READ_LIMITER: once_cell::sync::Lazy<RateLimiter> =
    once_cell::sync::Lazy::new(|| RateLimiter::new(RateLimitConfig::new(120, 60)));

static WRITE_LIMITER: once_cell::sync::Lazy<RateLimiter> =
    once_cell::sync::Lazy::new(|| RateLimiter::new(RateLimitConfig::new(30, 60)));

pub fn read_limiter() -> &'static RateLimiter {
    &READ_LIMITER
}

pub fn write_limiter() -> &'static RateLimiter {
    &WRITE_LIMITER
}

/// Client IP from `ConnectInfo`, else the first `x-forwarded-for` hop.
fn client_ip(req: &Request) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
}

async fn limit(limiter: &RateLimiter, request: Request, next: Next) -> Response {
    if let Some(ip) = client_ip(&request) {
        if !limiter.check(ip) {
            return limiter.reject();
        }
    }
    next.run(request).await
}

/// Middleware for `GET /generate-2fa` and `GET /health`.
pub async fn read_rate_limit(request: Request, next: Next) -> Response {
    limit(read_limiter(), request, next).await
}

/// Middleware for `POST /decrypt-seed` and `POST /verify-2fa`.
pub async fn write_rate_limit(request: Request, next: Next) -> Response {
    limit(write_limiter(), request, next).await
}
