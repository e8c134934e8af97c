//! Request logging
//!
//! Authorization redirects and token requests carry credentials in the query
//! string and the `Location` header, so both pass through the global
//! [`LogSanitizer`](huddle_logging::LogSanitizer) before they are logged.

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use huddle_logging::get_sanitizer;
use std::time::Instant;
use tracing::{info, warn};

/// Log one line per request with the sanitized URI, status and latency
pub async fn log_requests(request: Request, next: Next) -> Response {
    let sanitizer = get_sanitizer();
    let method = request.method().clone();
    let uri = sanitizer.sanitize(&request.uri().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| sanitizer.sanitize(value));

    if status.is_server_error() {
        warn!(%method, %uri, status = status.as_u16(), elapsed_ms, "Request failed");
    } else if let Some(location) = location {
        info!(%method, %uri, status = status.as_u16(), elapsed_ms, %location, "Request redirected");
    } else {
        info!(%method, %uri, status = status.as_u16(), elapsed_ms, "Request completed");
    }

    response
}
