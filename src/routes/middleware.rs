// ============================================================================
// Axum Middleware
// ============================================================================
//
// - request_logging: tag each request with an x-request-id and log the outcome
// - add_security_headers: API responses are never framed, sniffed or cached
//
// ============================================================================

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Reuse a caller-supplied id when it is printable and short, else mint one
fn request_id(req: &Request) -> HeaderValue {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .filter(|v| !v.is_empty() && v.len() <= 64 && v.to_str().is_ok())
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        })
}

pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let id = request_id(&req);
    req.headers_mut().insert(REQUEST_ID_HEADER, id.clone());

    let method = req.method().clone();
    // Path only: broadcast content travels in the query string
    let path = req.uri().path().to_string();
    let id_str = id.to_str().unwrap_or_default().to_string();

    let mut response = next.run(req).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::warn!(
            request_id = %id_str,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis(),
            "Request failed"
        );
    } else {
        tracing::info!(
            request_id = %id_str,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis(),
            "Request completed"
        );
    }

    response.headers_mut().insert(REQUEST_ID_HEADER, id);
    response
}

pub async fn add_security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    response
}
