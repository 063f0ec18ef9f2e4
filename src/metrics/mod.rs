//! Metrics for Breach Radar
//!
//! In-process counters, gauges and latency histograms with a Prometheus text
//! export served on `/metrics`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Process-wide metrics registry
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    histograms: RwLock<BTreeMap<String, Arc<Histogram>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    pub async fn add_counter(&self, name: &str, value: u64) {
        let counters = self.counters.read().await;
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        drop(counters);

        let mut counters = self.counters.write().await;
        counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(value, Ordering::Relaxed);
    }

    pub async fn set_gauge(&self, name: &str, value: u64) {
        let gauges = self.gauges.read().await;
        if let Some(gauge) = gauges.get(name) {
            gauge.store(value, Ordering::Relaxed);
            return;
        }
        drop(gauges);

        let mut gauges = self.gauges.write().await;
        gauges
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .store(value, Ordering::Relaxed);
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        let counters = self.counters.read().await;
        counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn get_gauge(&self, name: &str) -> u64 {
        let gauges = self.gauges.read().await;
        gauges
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Record a histogram observation, creating the histogram with latency
    /// buckets on first use
    pub async fn observe_histogram(&self, name: &str, value: f64) {
        let histograms = self.histograms.read().await;
        if let Some(histogram) = histograms.get(name) {
            histogram.observe(value);
            return;
        }
        drop(histograms);

        let mut histograms = self.histograms.write().await;
        histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::default()))
            .observe(value);
    }

    /// Account for one finished search.
    pub async fn record_search(&self, mode: SearchMode, outcome: &SearchOutcome) {
        let (requests, latency, results) = match mode {
            SearchMode::Exact => (
                metric_names::EXACT_SEARCHES,
                metric_names::EXACT_LATENCY,
                metric_names::EXACT_MATCHES,
            ),
            SearchMode::Sensitive => (
                metric_names::SENSITIVE_SEARCHES,
                metric_names::SENSITIVE_LATENCY,
                metric_names::SENSITIVE_CANDIDATES,
            ),
        };

        self.inc_counter(requests).await;
        self.add_counter(results, outcome.results as u64).await;
        if outcome.truncated {
            self.inc_counter(metric_names::TRUNCATED_SEARCHES).await;
        }
        self.observe_histogram(latency, outcome.elapsed_secs).await;
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub async fn to_prometheus(&self) -> String {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;
        let histograms = self.histograms.read().await;

        let mut output = String::new();

        output.push_str("# HELP breach_radar_uptime_seconds Time since service start\n");
        output.push_str("# TYPE breach_radar_uptime_seconds gauge\n");
        output.push_str(&format!(
            "breach_radar_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        for (name, counter) in counters.iter() {
            let prometheus_name = prometheus_name(name);
            output.push_str(&format!("# TYPE {} counter\n", prometheus_name));
            output.push_str(&format!(
                "{} {}\n",
                prometheus_name,
                counter.load(Ordering::Relaxed)
            ));
        }

        for (name, gauge) in gauges.iter() {
            let prometheus_name = prometheus_name(name);
            output.push_str(&format!("# TYPE {} gauge\n", prometheus_name));
            output.push_str(&format!(
                "{} {}\n",
                prometheus_name,
                gauge.load(Ordering::Relaxed)
            ));
        }

        for (name, histogram) in histograms.iter() {
            output.push_str(&histogram.to_prometheus(name));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prometheus_name(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Which correlator served a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    Sensitive,
}

/// Summary of a finished search
#[derive(Debug, Clone, Copy)]
pub struct SearchOutcome {
    pub results: usize,
    pub truncated: bool,
    pub elapsed_secs: f64,
}

/// Fixed-bucket histogram
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    /// Sum in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        let micros = (value.max(0.0) * 1_000_000.0) as u64;
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|bucket| value <= *bucket) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn to_prometheus(&self, name: &str) -> String {
        let prometheus_name = prometheus_name(name);
        let mut output = format!("# TYPE {} histogram\n", prometheus_name);

        let mut cumulative = 0u64;
        for (bucket, count) in self.buckets.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                prometheus_name, bucket, cumulative
            ));
        }

        output.push_str(&format!(
            "{}_bucket{{le=\"+Inf\"}} {}\n",
            prometheus_name,
            self.count()
        ));
        output.push_str(&format!(
            "{}_sum {}\n",
            prometheus_name,
            self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
        ));
        output.push_str(&format!("{}_count {}\n", prometheus_name, self.count()));

        output
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Latency in seconds, up to the default search deadline
        Self::new(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ])
    }
}

/// Metric names
pub mod metric_names {
    pub const EXACT_SEARCHES: &str = "breach_radar.search.exact.requests";
    pub const EXACT_MATCHES: &str = "breach_radar.search.exact.matches";
    pub const EXACT_LATENCY: &str = "breach_radar.search.exact.latency_seconds";

    pub const SENSITIVE_SEARCHES: &str = "breach_radar.search.sensitive.requests";
    pub const SENSITIVE_CANDIDATES: &str = "breach_radar.search.sensitive.candidate_breaches";
    pub const SENSITIVE_LATENCY: &str = "breach_radar.search.sensitive.latency_seconds";

    /// Searches that skipped at least one breach
    pub const TRUNCATED_SEARCHES: &str = "breach_radar.search.truncated";

    pub const CLIENT_ERRORS: &str = "breach_radar.errors.client";
    pub const SERVER_ERRORS: &str = "breach_radar.errors.server";

    pub const CATALOG_BREACHES: &str = "breach_radar.catalog.breaches";
}

/// Time an async operation into a histogram
pub async fn timed<F, T>(metrics: &MetricsRegistry, metric_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f.await;
    metrics
        .observe_histogram(metric_name, start.elapsed().as_secs_f64())
        .await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counter() {
        let registry = MetricsRegistry::new();

        registry.inc_counter("test.counter").await;
        registry.inc_counter("test.counter").await;
        registry.add_counter("test.counter", 5).await;

        assert_eq!(registry.get_counter("test.counter").await, 7);
        assert_eq!(registry.get_counter("missing").await, 0);
    }

    #[tokio::test]
    async fn test_gauge() {
        let registry = MetricsRegistry::new();

        registry.set_gauge(metric_names::CATALOG_BREACHES, 3).await;
        registry.set_gauge(metric_names::CATALOG_BREACHES, 4).await;
        assert_eq!(registry.get_gauge(metric_names::CATALOG_BREACHES).await, 4);
    }

    #[tokio::test]
    async fn test_record_search() {
        let registry = MetricsRegistry::new();
        let outcome = SearchOutcome {
            results: 2,
            truncated: true,
            elapsed_secs: 0.02,
        };

        registry.record_search(SearchMode::Exact, &outcome).await;
        registry.record_search(SearchMode::Exact, &outcome).await;

        assert_eq!(registry.get_counter(metric_names::EXACT_SEARCHES).await, 2);
        assert_eq!(registry.get_counter(metric_names::EXACT_MATCHES).await, 4);
        assert_eq!(
            registry.get_counter(metric_names::TRUNCATED_SEARCHES).await,
            2
        );
        assert_eq!(
            registry.get_counter(metric_names::SENSITIVE_SEARCHES).await,
            0
        );
    }

    #[tokio::test]
    async fn test_timed_observes_latency() {
        let registry = MetricsRegistry::new();
        let value = timed(&registry, "test.latency", async { 42 }).await;
        assert_eq!(value, 42);

        let prometheus = registry.to_prometheus().await;
        assert!(prometheus.contains("test_latency_count 1"));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let histogram = Histogram::new(vec![0.1, 1.0]);
        histogram.observe(0.05);
        histogram.observe(0.5);
        histogram.observe(5.0);

        let text = histogram.to_prometheus("lat");
        assert!(text.contains("lat_bucket{le=\"0.1\"} 1"));
        assert!(text.contains("lat_bucket{le=\"1\"} 2"));
        assert!(text.contains("lat_bucket{le=\"+Inf\"} 3"));
        assert!(text.contains("lat_count 3"));
    }

    #[tokio::test]
    async fn test_prometheus_format() {
        let registry = MetricsRegistry::new();

        registry.inc_counter(metric_names::CLIENT_ERRORS).await;
        registry.set_gauge("catalog-size", 42).await;

        let prometheus = registry.to_prometheus().await;
        assert!(prometheus.contains("breach_radar_errors_client 1"));
        assert!(prometheus.contains("catalog_size 42"));
        assert!(prometheus.contains("# TYPE breach_radar_uptime_seconds gauge"));
    }
}
