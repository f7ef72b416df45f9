//! # Middleware
//!
//! Execution order, outermost first:
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
