//! Tracing middleware for HTTP requests

use axum::{
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::tracing_logger::{CorrelationId, CORRELATION_HEADER};

/// Extract correlation ID from headers or generate new one
fn extract_correlation_id(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| CorrelationId::from_string(s.to_string()))
        .unwrap_or_else(CorrelationId::new)
}

/// Wraps every request in a span and echoes the correlation ID back
pub async fn tracing_middleware<B>(mut req: Request<B>, next: Next<B>) -> Response {
    let correlation_id = extract_correlation_id(req.headers());
    req.extensions_mut().insert(correlation_id.clone());

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let span = info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    span.in_scope(|| {
        if status.is_server_error() {
            warn!(status = status.as_u16(), elapsed_ms, "Request failed");
        } else {
            info!(status = status.as_u16(), elapsed_ms, "Request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&correlation_id.0) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}
