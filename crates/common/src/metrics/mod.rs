//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, gauge, describe_gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Scholarport metrics
pub const METRICS_PREFIX: &str = "scholarport";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Catalog metrics
    describe_counter!(
        format!("{}_catalog_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of catalog queries"
    );

    describe_histogram!(
        format!("{}_catalog_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Catalog query latency in seconds"
    );

    describe_gauge!(
        format!("{}_catalog_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from a catalog query"
    );

    // Moderation metrics
    describe_counter!(
        format!("{}_moderation_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Total moderation transitions attempted"
    );

    // Submission metrics
    describe_counter!(
        format!("{}_papers_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers submitted"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record catalog query metrics
pub fn record_catalog_query(operation: &str, duration_secs: f64, result_count: usize) {
    counter!(
        format!("{}_catalog_queries_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_catalog_query_duration_seconds", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_catalog_results_count", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record moderation transition attempts
pub fn record_transition(to_status: &str, permitted: bool) {
    let outcome = if permitted { "applied" } else { "rejected" };

    counter!(
        format!("{}_moderation_transitions_total", METRICS_PREFIX),
        "to_status" => to_status.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record paper submissions
pub fn record_submission(category: &str) {
    counter!(
        format!("{}_papers_submitted_total", METRICS_PREFIX),
        "category" => category.to_string()
    )
    .increment(1);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // P50 target (50ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.050));
        // P99 target (250ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.250));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/v1/papers/search");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
