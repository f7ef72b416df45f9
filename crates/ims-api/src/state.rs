//! # Application State
//!
//! Shared state handed to every handler: configuration, the lifecycle
//! repository, and the metrics registry. Cloning is cheap; every field is
//! reference-counted or `Copy`.

use sqlx::PgPool;

use crate::auth::SecretToken;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::repository::LifecycleRepository;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_secret: Option<SecretToken>,
    /// Requests per caller per minute.
    pub rate_limit: u64,
    /// Whether `/metrics` is served.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rate_limit", &self.rate_limit)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_secret: None,
            rate_limit: RateLimitConfig::default().max_requests,
            metrics_enabled: true,
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: LifecycleRepository,
    pub metrics: ApiMetrics,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Default configuration, in-memory repository.
    pub fn try_new() -> Result<Self, prometheus::Error> {
        Self::try_with_config(AppConfig::default(), None)
    }

    /// Build state from configuration. With a pool the repository is
    /// PostgreSQL-backed, otherwise in-memory.
    pub fn try_with_config(
        config: AppConfig,
        db_pool: Option<PgPool>,
    ) -> Result<Self, prometheus::Error> {
        let repo = match db_pool {
            Some(pool) => LifecycleRepository::Postgres(pool),
            None => LifecycleRepository::in_memory(),
        };
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit,
            window_secs: 60,
        });
        Ok(Self {
            config,
            repo,
            metrics: ApiMetrics::new()?,
            rate_limiter,
        })
    }
}
