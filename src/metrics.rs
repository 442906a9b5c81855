//! Request and prediction statistics for the ingestion service.

use crate::types::prediction::{PredictionResult, RiskCategory};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all handlers
pub struct ServiceMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Records that could not be scored
    pub prediction_failures: AtomicU64,
    /// Telemetry records accepted
    pub telemetry_ingested: AtomicU64,
    /// CSV files accepted
    pub csv_uploads: AtomicU64,
    /// Rows loaded from CSV files
    pub csv_rows: AtomicU64,
    pub object_store_failures: AtomicU64,
    pub database_failures: AtomicU64,
    /// Predictions by risk category
    predictions_by_risk: RwLock<BTreeMap<String, u64>>,
    /// Prediction latencies (in microseconds)
    prediction_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            prediction_failures: AtomicU64::new(0),
            telemetry_ingested: AtomicU64::new(0),
            csv_uploads: AtomicU64::new(0),
            csv_rows: AtomicU64::new(0),
            object_store_failures: AtomicU64::new(0),
            database_failures: AtomicU64::new(0),
            predictions_by_risk: RwLock::new(BTreeMap::new()),
            prediction_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a scored record
    pub fn record_prediction(&self, elapsed: Duration, result: &PredictionResult) {
        self.predictions.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.prediction_times.write() {
            times.push(elapsed.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut by_risk) = self.predictions_by_risk.write() {
            *by_risk.entry(risk_key(result.risk)).or_insert(0) += 1;
        }
    }

    pub fn record_prediction_failure(&self) {
        self.prediction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_telemetry(&self) {
        self.telemetry_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_csv_upload(&self, rows: usize) {
        self.csv_uploads.fetch_add(1, Ordering::Relaxed);
        self.csv_rows.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn record_object_store_failure(&self) {
        self.object_store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_database_failure(&self) {
        self.database_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get prediction latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.prediction_times.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    pub fn get_predictions_by_risk(&self) -> BTreeMap<String, u64> {
        self.predictions_by_risk
            .read()
            .map(|by_risk| by_risk.clone())
            .unwrap_or_default()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            predictions: self.predictions.load(Ordering::Relaxed),
            prediction_failures: self.prediction_failures.load(Ordering::Relaxed),
            predictions_by_risk: self.get_predictions_by_risk(),
            telemetry_ingested: self.telemetry_ingested.load(Ordering::Relaxed),
            csv_uploads: self.csv_uploads.load(Ordering::Relaxed),
            csv_rows: self.csv_rows.load(Ordering::Relaxed),
            object_store_failures: self.object_store_failures.load(Ordering::Relaxed),
            database_failures: self.database_failures.load(Ordering::Relaxed),
            latency: self.get_latency_stats(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let latency = &snapshot.latency;

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          HEART FAILURE INGEST SERVICE - METRICS SUMMARY      ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions: {:>8}  │  Failures: {:>8}  │  Uptime: {:>6}s ║",
            snapshot.predictions, snapshot.prediction_failures, snapshot.uptime_secs
        );
        info!(
            "║ Telemetry records: {:>8}  │  CSV uploads: {:>4} ({:>7} rows) ║",
            snapshot.telemetry_ingested, snapshot.csv_uploads, snapshot.csv_rows
        );
        info!(
            "║ Write failures: object store={:>5} database={:>5}            ║",
            snapshot.object_store_failures, snapshot.database_failures
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}       ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Predictions by Risk:                                         ║");
        for (risk, count) in &snapshot.predictions_by_risk {
            let pct = if snapshot.predictions > 0 {
                (*count as f64 / snapshot.predictions as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", risk, count, pct);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn risk_key(risk: RiskCategory) -> String {
    serde_json::to_value(risk)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", risk))
}

/// Prediction latency statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view served on the metrics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions: u64,
    pub prediction_failures: u64,
    pub predictions_by_risk: BTreeMap<String, u64>,
    pub telemetry_ingested: u64,
    pub csv_uploads: u64,
    pub csv_rows: u64,
    pub object_store_failures: u64,
    pub database_failures: u64,
    pub latency: LatencyStats,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
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

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &PredictionResult::new(1, None));
        metrics.record_prediction(Duration::from_micros(300), &PredictionResult::new(0, None));
        metrics.record_prediction(Duration::from_micros(200), &PredictionResult::new(1, None));
        metrics.record_prediction_failure();
        metrics.record_csv_upload(299);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions, 3);
        assert_eq!(snapshot.prediction_failures, 1);
        assert_eq!(snapshot.csv_uploads, 1);
        assert_eq!(snapshot.csv_rows, 299);
        assert_eq!(snapshot.predictions_by_risk.get("HIGH_RISK"), Some(&2));
        assert_eq!(snapshot.predictions_by_risk.get("LOW_RISK"), Some(&1));
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.get_latency_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_prediction(Duration::from_micros(us), &PredictionResult::unknown());
        }

        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }
}
