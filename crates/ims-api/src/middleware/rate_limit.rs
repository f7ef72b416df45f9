//! # Per-Caller Rate Limiting
//!
//! Fixed-window rate limiter keyed by the authenticated actor id. Runs after
//! authentication so rejected credentials never consume quota.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::AppError;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u64,
    started: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether a request from `key` is within budget. Counts the request if so.
    fn check(&self, key: &str, now: Instant) -> bool {
        let window_len = Duration::from_secs(self.config.window_secs);
        let mut windows = self.windows.lock();
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) >= window_len {
            window.count = 0;
            window.started = now;
        }

        if window.count >= self.config.max_requests {
            false
        } else {
            window.count += 1;
            true
        }
    }
}

/// Middleware that enforces per-caller rate limits.
///
/// Keys on the [`CallerIdentity`] injected by the auth middleware; requests
/// without one share the `anonymous` budget.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() {
        let key = request
            .extensions()
            .get::<CallerIdentity>()
            .map(|c| c.actor().as_str().to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        if !limiter.check(&key, Instant::now()) {
            tracing::warn!(actor = %key, "rate limit exceeded");
            return AppError::RateLimited.into_response();
        }
    }

    next.run(request).await
}
