//! Request id tracking and per-request HTTP metrics.
//!
//! Every request gets an id, taken from the `X-Request-ID` header when it
//! carries a UUID and generated otherwise. The id is stored in request
//! extensions, attached to a tracing span around the handler, and echoed
//! back on the response.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, Router};
//! use recipe_catalog_web::middleware::track_request;
//!
//! let app = Router::new()
//!     .route("/recipes", get(list_recipes))
//!     .layer(middleware::from_fn(track_request));
//! ```

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Header name for the request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Request id stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Tag the request with an id, trace it, and record its latency.
pub async fn track_request(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    req.extensions_mut().insert(RequestId(request_id));

    let method = req.method().to_string();
    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        uri = %req.uri(),
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span).await;
    let status = response.status().as_u16().to_string();

    metrics::counter!("http_requests_total", "method" => method.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
