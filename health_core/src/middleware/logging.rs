//! Probe request tracing

use crate::AppState;
use axum::{body::Body, Router};
use http::{Request, Response, StatusCode};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::{info_span, Span};

/// Wraps `router` in a tracing layer for probe traffic. A 503 is the normal
/// answer to a DOWN aggregate, so it is logged as a warning, not a failure.
pub fn with_request_tracing(router: Router<AppState>) -> Router<AppState> {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                info_span!(
                    "probe_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_request(|request: &Request<Body>, _span: &Span| {
                tracing::debug!("started probe {} {}", request.method(), request.uri().path());
            })
            .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                let status = response.status();
                let latency_ms = latency.as_millis() as u64;

                if status.is_success() {
                    tracing::info!(status = status.as_u16(), latency_ms, "probe answered UP");
                } else if status == StatusCode::SERVICE_UNAVAILABLE {
                    tracing::warn!(status = status.as_u16(), latency_ms, "probe answered DOWN");
                } else if status.is_client_error() {
                    tracing::warn!(status = status.as_u16(), latency_ms, "client error response");
                } else {
                    tracing::error!(status = status.as_u16(), latency_ms, "server error response");
                }
            })
            .on_failure(|error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                let reported_down = matches!(
                    error,
                    ServerErrorsFailureClass::StatusCode(code) if code == StatusCode::SERVICE_UNAVAILABLE
                );
                if !reported_down {
                    tracing::error!(
                        latency_ms = latency.as_millis() as u64,
                        error = ?error,
                        "request failed"
                    );
                }
            }),
    )
}
