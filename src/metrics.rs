//! Prometheus-compatible metrics for the Tributary service.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Latency buckets from 5ms to 30s; oracle round-trips dominate.
fn latency_buckets() -> Vec<f64> {
    vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
}

/// All metrics for the query service.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    /// Total queries processed, including failures.
    pub queries_total: IntCounter,
    /// Queries that ended with a "no data" outcome.
    pub queries_no_data_total: IntCounter,
    /// Oracle calls that failed.
    pub oracle_failures_total: IntCounter,
    /// Retriever fetches that failed.
    pub retriever_failures_total: IntCounter,
    /// Queries answered by joining two sources.
    pub joins_total: IntCounter,
    /// Annotations removed by pruning.
    pub annotations_pruned_total: IntCounter,

    /// Current number of stored annotations.
    pub annotations_count: IntGauge,

    /// End-to-end query duration in seconds.
    pub query_duration_seconds: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let queries_total = IntCounter::new(
            "tributary_queries_total",
            "Total queries processed, including failures",
        )
        .expect("failed to create counter");

        let queries_no_data_total = IntCounter::new(
            "tributary_queries_no_data_total",
            "Queries that ended with a no-data outcome",
        )
        .expect("failed to create counter");

        let oracle_failures_total = IntCounter::new(
            "tributary_oracle_failures_total",
            "Oracle calls that failed",
        )
        .expect("failed to create counter");

        let retriever_failures_total = IntCounter::new(
            "tributary_retriever_failures_total",
            "Retriever fetches that failed",
        )
        .expect("failed to create counter");

        let joins_total = IntCounter::new(
            "tributary_joins_total",
            "Queries answered by joining two sources",
        )
        .expect("failed to create counter");

        let annotations_pruned_total = IntCounter::new(
            "tributary_annotations_pruned_total",
            "Annotations removed by pruning",
        )
        .expect("failed to create counter");

        let annotations_count = IntGauge::new(
            "tributary_annotations_count",
            "Current number of stored annotations",
        )
        .expect("failed to create gauge");

        let query_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "tributary_query_duration_seconds",
                "End-to-end query duration in seconds",
            )
            .buckets(latency_buckets()),
        )
        .expect("failed to create histogram");

        for collector in [
            Box::new(queries_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(queries_no_data_total.clone()),
            Box::new(oracle_failures_total.clone()),
            Box::new(retriever_failures_total.clone()),
            Box::new(joins_total.clone()),
            Box::new(annotations_pruned_total.clone()),
            Box::new(annotations_count.clone()),
            Box::new(query_duration_seconds.clone()),
        ] {
            registry
                .register(collector)
                .expect("failed to register metric");
        }

        Self {
            registry,
            queries_total,
            queries_no_data_total,
            oracle_failures_total,
            retriever_failures_total,
            joins_total,
            annotations_pruned_total,
            annotations_count,
            query_duration_seconds,
        }
    }
}
