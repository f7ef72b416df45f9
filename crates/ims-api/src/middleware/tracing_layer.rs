//! # Request/Response Tracing
//!
//! Configures `tower_http::trace::TraceLayer` so every request gets a span
//! carrying method, matched path and request id, and every response logs
//! its status and latency.

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, MakeSpan, TraceLayer};
use tracing::{Level, Span};

/// Span factory for API requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiMakeSpan;

impl<B> MakeSpan<B> for ApiMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
        )
    }
}

/// Build the `TraceLayer` for the lifecycle API.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, ApiMakeSpan> {
    TraceLayer::new_for_http()
        .make_span_with(ApiMakeSpan)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}
