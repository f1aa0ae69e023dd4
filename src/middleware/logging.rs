//! Request logging middleware.
//!
//! One line per request with method, path, status and latency. Health checks
//! are polled by the platform and skipped.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == "/health" {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    match status {
        // Expected on /api/data until the first snapshot is published.
        503 => debug!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Snapshot not available yet"
        ),
        500.. => warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request failed (5xx)"
        ),
        400..=499 => info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed (4xx)"
        ),
        _ => debug!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed"
        ),
    }

    response
}
