//! Dispatch metrics and statistics tracking for the prediction service.

use crate::types::prediction::{Indicator, PredictionResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Per-indicator counters
#[derive(Debug, Default, Clone)]
struct IndicatorCounters {
    predictions: u64,
    failures: u64,
    labels: HashMap<String, u64>,
    /// Inference times (in microseconds)
    times: Vec<u64>,
}

/// Metrics collector for submissions and classifier calls
pub struct DispatchMetrics {
    /// Submissions that produced a report
    pub submissions_processed: AtomicU64,
    /// Submissions rejected by validation
    pub submissions_rejected: AtomicU64,
    /// Payloads that could not be decoded
    pub malformed_payloads: AtomicU64,
    /// End-to-end processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Indexed by `Indicator::index`
    indicators: RwLock<[IndicatorCounters; 3]>,
    /// Confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            submissions_processed: AtomicU64::new(0),
            submissions_rejected: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            indicators: RwLock::new(Default::default()),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a submission that produced a report
    pub fn record_submission(&self, processing_time: Duration) {
        self.submissions_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    pub fn record_rejection(&self) {
        self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful prediction and its inference time
    pub fn record_prediction(&self, result: &PredictionResult, duration: Duration) {
        if let Ok(mut indicators) = self.indicators.write() {
            let counters = &mut indicators[result.indicator.index()];
            counters.predictions += 1;
            *counters.labels.entry(result.label.clone()).or_insert(0) += 1;
            counters.times.push(duration.as_micros() as u64);
            // Keep only last 1000 per indicator
            if counters.times.len() > 1000 {
                counters.times.drain(0..500);
            }
        }

        let bucket = (result.confidence * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_failure(&self, indicator: Indicator) {
        if let Ok(mut indicators) = self.indicators.write() {
            indicators[indicator.index()].failures += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> LatencyStats {
        self.processing_times
            .read()
            .map(|times| LatencyStats::from_samples(&times))
            .unwrap_or_default()
    }

    /// Get per-indicator statistics in report order
    pub fn get_indicator_stats(&self) -> Vec<(Indicator, IndicatorStats)> {
        let Ok(indicators) = self.indicators.read() else {
            return Vec::new();
        };

        Indicator::ALL
            .into_iter()
            .map(|indicator| {
                let counters = &indicators[indicator.index()];
                let stats = IndicatorStats {
                    predictions: counters.predictions,
                    failures: counters.failures,
                    labels: counters.labels.clone(),
                    latency: LatencyStats::from_samples(&counters.times),
                };
                (indicator, stats)
            })
            .collect()
    }

    /// Get current throughput (submissions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.submissions_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or([0; 10])
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processed = self.submissions_processed.load(Ordering::Relaxed);
        let rejected = self.submissions_rejected.load(Ordering::Relaxed);
        let malformed = self.malformed_payloads.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();

        info!("==================== PREDICTION SERVICE METRICS ====================");
        info!(
            "Submissions: processed={} rejected={} malformed={} ({:.1}/s)",
            processed, rejected, malformed, throughput
        );
        info!(
            "Processing time (us): mean={} p50={} p95={} p99={} max={}",
            processing.mean_us,
            processing.p50_us,
            processing.p95_us,
            processing.p99_us,
            processing.max_us
        );

        for (indicator, stats) in self.get_indicator_stats() {
            info!(
                "{}: predictions={} failures={} mean={}us p99={}us",
                indicator,
                stats.predictions,
                stats.failures,
                stats.latency.mean_us,
                stats.latency.p99_us
            );
            let mut labels: Vec<_> = stats.labels.iter().collect();
            labels.sort();
            for (label, count) in labels {
                info!("  {:20} {:>6}", label, count);
            }
        }

        let distribution = self.get_confidence_distribution();
        let total: u64 = distribution.iter().sum();
        if total > 0 {
            info!("Confidence distribution:");
            for (i, &count) in distribution.iter().enumerate() {
                let pct = (count as f64 / total as f64) * 100.0;
                let bar = "#".repeat(((pct / 5.0) as usize).min(20));
                info!(
                    "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct,
                    bar
                );
            }
        }
        info!("====================================================================");
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics over a sample window
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl LatencyStats {
    fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        Self {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }
}

/// Indicator-specific statistics
#[derive(Debug, Clone)]
pub struct IndicatorStats {
    pub predictions: u64,
    pub failures: u64,
    pub labels: HashMap<String, u64>,
    pub latency: LatencyStats,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<DispatchMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<DispatchMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(indicator: Indicator, label: &str, confidence: f64) -> PredictionResult {
        PredictionResult {
            indicator,
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = DispatchMetrics::new();

        metrics.record_submission(Duration::from_micros(100));
        metrics.record_submission(Duration::from_micros(300));
        metrics.record_rejection();
        metrics.record_malformed();

        assert_eq!(metrics.submissions_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.submissions_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.malformed_payloads.load(Ordering::Relaxed), 1);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 200);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_indicator_stats() {
        let metrics = DispatchMetrics::new();

        metrics.record_prediction(&result(Indicator::Stunting, "normal", 0.92), Duration::from_micros(50));
        metrics.record_prediction(&result(Indicator::Stunting, "stunted", 0.55), Duration::from_micros(70));
        metrics.record_failure(Indicator::Wasting);

        let stats = metrics.get_indicator_stats();
        assert_eq!(stats.len(), 3);

        let (indicator, stunting) = &stats[0];
        assert_eq!(*indicator, Indicator::Stunting);
        assert_eq!(stunting.predictions, 2);
        assert_eq!(stunting.labels.get("normal"), Some(&1));
        assert_eq!(stunting.latency.mean_us, 60);

        assert_eq!(stats[1].1.failures, 1);
        assert_eq!(stats[2].1.predictions, 0);
    }

    #[test]
    fn test_confidence_buckets() {
        let metrics = DispatchMetrics::new();

        metrics.record_prediction(&result(Indicator::Wasting, "normal", 1.0), Duration::ZERO);
        metrics.record_prediction(&result(Indicator::Wasting, "normal", 0.05), Duration::ZERO);

        let distribution = metrics.get_confidence_distribution();
        assert_eq!(distribution[9], 1);
        assert_eq!(distribution[0], 1);
    }

    #[test]
    fn test_empty_latency_stats() {
        assert_eq!(LatencyStats::from_samples(&[]), LatencyStats::default());
    }
}
