//! Prometheus-compatible metrics for termap.
//!
//! Counters and duration histograms for term collection, the term cache and
//! phrase mapping, using the prometheus crate.

use prometheus::{self, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Histogram buckets for durations in seconds, from 1ms to 2 minutes.
/// Ontology downloads dominate the upper end.
fn default_latency_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    ]
}

/// All metrics for termap.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    // =========================================================================
    // Counters
    // =========================================================================
    /// Total number of term records collected from ontology sources.
    pub terms_collected_total: IntCounter,
    /// Total number of ontologies collected.
    pub ontologies_collected_total: IntCounter,
    /// Total number of term cache hits (memory or disk).
    pub cache_hits_total: IntCounter,
    /// Total number of term cache misses.
    pub cache_misses_total: IntCounter,
    /// Total number of phrases with at least one mapping.
    pub phrases_mapped_total: IntCounter,
    /// Total number of phrases without any mapping.
    pub phrases_unmapped_total: IntCounter,
    /// Remote annotation failures, labelled by service.
    pub remote_failures_total: IntCounterVec,

    // =========================================================================
    // Histograms (durations in seconds)
    // =========================================================================
    /// Ontology collection duration in seconds.
    pub collection_duration_seconds: Histogram,
    /// Full mapping call duration in seconds.
    pub mapping_duration_seconds: Histogram,
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

        let terms_collected_total = IntCounter::new(
            "termap_terms_collected_total",
            "Total number of term records collected from ontology sources",
        )
        .expect("failed to create counter");

        let ontologies_collected_total = IntCounter::new(
            "termap_ontologies_collected_total",
            "Total number of ontologies collected",
        )
        .expect("failed to create counter");

        let cache_hits_total =
            IntCounter::new("termap_cache_hits_total", "Total number of term cache hits")
                .expect("failed to create counter");

        let cache_misses_total = IntCounter::new(
            "termap_cache_misses_total",
            "Total number of term cache misses",
        )
        .expect("failed to create counter");

        let phrases_mapped_total = IntCounter::new(
            "termap_phrases_mapped_total",
            "Total number of phrases with at least one mapping",
        )
        .expect("failed to create counter");

        let phrases_unmapped_total = IntCounter::new(
            "termap_phrases_unmapped_total",
            "Total number of phrases without any mapping",
        )
        .expect("failed to create counter");

        let remote_failures_total = IntCounterVec::new(
            Opts::new(
                "termap_remote_failures_total",
                "Total number of failed remote annotation requests",
            ),
            &["service"],
        )
        .expect("failed to create counter");

        let collection_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "termap_collection_duration_seconds",
                "Ontology collection duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        let mapping_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "termap_mapping_duration_seconds",
                "Mapping call duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        registry
            .register(Box::new(terms_collected_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(ontologies_collected_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(cache_hits_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(cache_misses_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(phrases_mapped_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(phrases_unmapped_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(remote_failures_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(collection_duration_seconds.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(mapping_duration_seconds.clone()))
            .expect("failed to register metric");

        Self {
            registry,
            terms_collected_total,
            ontologies_collected_total,
            cache_hits_total,
            cache_misses_total,
            phrases_mapped_total,
            phrases_unmapped_total,
            remote_failures_total,
            collection_duration_seconds,
            mapping_duration_seconds,
        }
    }

    /// Count a failed remote request for `service`.
    pub fn record_remote_failure(&self, service: &str) {
        self.remote_failures_total.with_label_values(&[service]).inc();
    }

    /// Export metrics in Prometheus text format.
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Export metrics as JSON.
    pub fn export_json(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: MetricsCounters {
                terms_collected_total: self.terms_collected_total.get(),
                ontologies_collected_total: self.ontologies_collected_total.get(),
                cache_hits_total: self.cache_hits_total.get(),
                cache_misses_total: self.cache_misses_total.get(),
                phrases_mapped_total: self.phrases_mapped_total.get(),
                phrases_unmapped_total: self.phrases_unmapped_total.get(),
            },
            histograms: MetricsHistograms {
                collection_duration_seconds: HistogramSnapshot::from_prometheus(
                    &self.collection_duration_seconds,
                ),
                mapping_duration_seconds: HistogramSnapshot::from_prometheus(
                    &self.mapping_duration_seconds,
                ),
            },
        }
    }

    /// Start a timer that records duration to a histogram when dropped.
    /// Returns a guard that will observe the duration in seconds.
    pub fn start_timer(histogram: &Histogram) -> HistogramTimer {
        HistogramTimer {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }
}

/// Timer that records duration to a histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.histogram.observe(duration.as_secs_f64());
    }
}

impl HistogramTimer {
    /// Get the elapsed time without stopping the timer.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Snapshot of all metrics for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: MetricsCounters,
    pub histograms: MetricsHistograms,
}

/// Counter metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsCounters {
    pub terms_collected_total: u64,
    pub ontologies_collected_total: u64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub phrases_mapped_total: u64,
    pub phrases_unmapped_total: u64,
}

/// Histogram metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsHistograms {
    pub collection_duration_seconds: HistogramSnapshot,
    pub mapping_duration_seconds: HistogramSnapshot,
}

/// Snapshot of a histogram for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    pub mean: Option<f64>,
}

impl HistogramSnapshot {
    /// Create a snapshot from a prometheus histogram.
    pub fn from_prometheus(h: &Histogram) -> Self {
        let sample_count = h.get_sample_count();
        let sample_sum = h.get_sample_sum();
        let mean = if sample_count > 0 {
            Some(sample_sum / sample_count as f64)
        } else {
            None
        };
        Self {
            count: sample_count,
            sum: sample_sum,
            mean,
        }
    }
}
