//! Metrics recording for Tenderhub services
//!
//! Thin helpers over the `metrics` facade. The gateway installs a
//! Prometheus exporter at startup; library code records through these
//! helpers so metric names stay in one place.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Prefix applied to all metric names
pub const PREFIX: &str = "tenderhub";

/// Register metric descriptions with the installed recorder
pub fn register_metrics() {
    describe_counter!(
        format!("{}_http_requests_total", PREFIX),
        "Total HTTP requests handled"
    );
    describe_histogram!(
        format!("{}_http_request_duration_seconds", PREFIX),
        "HTTP request latency in seconds"
    );
    describe_counter!(
        format!("{}_graph_queries_total", PREFIX),
        "Total SPARQL queries executed against the graph store"
    );
    describe_histogram!(
        format!("{}_graph_query_duration_seconds", PREFIX),
        "SPARQL query latency in seconds"
    );
    describe_counter!(
        format!("{}_links_toggled_total", PREFIX),
        "Saved-tender links toggled, labeled by resulting state"
    );
    describe_counter!(
        format!("{}_summaries_written_total", PREFIX),
        "AI summaries created or updated"
    );
    describe_counter!(
        format!("{}_summaries_generated_total", PREFIX),
        "AI summaries produced by the external LLM"
    );
    describe_counter!(
        format!("{}_search_queries_total", PREFIX),
        "Search index queries executed"
    );
    describe_histogram!(
        format!("{}_search_query_duration_seconds", PREFIX),
        "Search index query latency in seconds"
    );
}

/// Record one handled HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    counter!(
        format!("{}_http_requests_total", PREFIX),
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(
        format!("{}_http_request_duration_seconds", PREFIX),
        "method" => method.to_string(),
        "path" => path.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record one SPARQL query against the graph store
pub fn record_graph_query(name: &'static str, duration: Duration) {
    counter!(
        format!("{}_graph_queries_total", PREFIX),
        "query" => name,
    )
    .increment(1);
    histogram!(
        format!("{}_graph_query_duration_seconds", PREFIX),
        "query" => name,
    )
    .record(duration.as_secs_f64());
}

/// Record a save toggle and the state it produced
pub fn record_link_toggled(saved: bool) {
    counter!(
        format!("{}_links_toggled_total", PREFIX),
        "saved" => if saved { "true" } else { "false" },
    )
    .increment(1);
}

/// Record a summary write (manual or generated)
pub fn record_summary_written() {
    counter!(format!("{}_summaries_written_total", PREFIX)).increment(1);
}

/// Record a summary produced by the external LLM
pub fn record_summary_generated(model: &str) {
    counter!(
        format!("{}_summaries_generated_total", PREFIX),
        "model" => model.to_string(),
    )
    .increment(1);
}

/// Record one search index query
pub fn record_search_query(duration: Duration) {
    counter!(format!("{}_search_queries_total", PREFIX)).increment(1);
    histogram!(format!("{}_search_query_duration_seconds", PREFIX))
        .record(duration.as_secs_f64());
}
