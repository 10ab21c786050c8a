//! Gateway middleware

pub mod rate_limit;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use scholarport_common::metrics::RequestMetrics;

/// Record a request counter and latency histogram per route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Use the route template, not the raw path, to keep label
    // cardinality bounded
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let metrics = RequestMetrics::start(&method, &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}
