//! Middleware implementations for the proxy service

use crate::infrastructure::log_messages::relay as messages;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Logging middleware - logs method, path, status and timing per call
///
/// For streamed responses the duration covers time to first byte, not the
/// full body.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "{}",
        messages::REQUEST_COMPLETED
    );

    response
}
