//! Delivery statistics and in-process ground truth for the publish pipeline.

use crate::catalog::FraudStrategy;
use crate::synthesizer::FraudDecision;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Outcome of one `publish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Records handed to the broker client
    pub submitted: u64,
    /// Records acknowledged by the broker
    pub delivered: u64,
    /// Records rejected at submission or delivery
    pub failed: u64,
    /// Records still unacknowledged when the flush barrier gave up
    pub unacknowledged: u64,
    /// Records that could not be encoded
    pub serialization_failures: u64,
}

impl PublishReport {
    /// Every record that did not reach the broker.
    pub fn failure_count(&self) -> u64 {
        self.failed + self.unacknowledged + self.serialization_failures
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Fraud labels of everything synthesized. Never leaves the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundTruthTally {
    pub legitimate: u64,
    pub by_strategy: HashMap<FraudStrategy, u64>,
}

impl GroundTruthTally {
    pub fn record(&mut self, decision: FraudDecision) {
        match decision {
            FraudDecision::Legitimate => self.legitimate += 1,
            FraudDecision::Fraudulent(strategy) => {
                *self.by_strategy.entry(strategy).or_insert(0) += 1
            }
        }
    }

    pub fn fraudulent(&self) -> u64 {
        self.by_strategy.values().sum()
    }

    pub fn total(&self) -> u64 {
        self.legitimate + self.fraudulent()
    }

    pub fn fraud_rate(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.fraudulent() as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Metrics collector for the publish pipeline
pub struct PublishMetrics {
    pub records_synthesized: AtomicU64,
    pub records_submitted: AtomicU64,
    pub deliveries_acked: AtomicU64,
    pub deliveries_failed: AtomicU64,
    pub deliveries_abandoned: AtomicU64,
    pub serialization_failures: AtomicU64,
    ground_truth: RwLock<GroundTruthTally>,
    /// Submit-to-settle times (in microseconds). A record settles when the
    /// pipeline next polls its ack, so this is an upper bound on ack latency.
    settle_latencies: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl PublishMetrics {
    pub fn new() -> Self {
        Self {
            records_synthesized: AtomicU64::new(0),
            records_submitted: AtomicU64::new(0),
            deliveries_acked: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            deliveries_abandoned: AtomicU64::new(0),
            serialization_failures: AtomicU64::new(0),
            ground_truth: RwLock::new(GroundTruthTally::default()),
            settle_latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    pub fn record_synthesized(&self, decision: FraudDecision) {
        self.records_synthesized.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tally) = self.ground_truth.write() {
            tally.record(decision);
        }
    }

    pub fn record_submitted(&self) {
        self.records_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, settled_in: Duration) {
        self.deliveries_acked.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut latencies) = self.settle_latencies.write() {
            latencies.push(settled_in.as_micros() as u64);
            // Keep only last 10000
            if latencies.len() > 10000 {
                latencies.drain(0..5000);
            }
        }
    }

    pub fn record_failed(&self) {
        self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: u64) {
        self.deliveries_abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_serialization_failure(&self) {
        self.serialization_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ground_truth(&self) -> GroundTruthTally {
        self.ground_truth
            .read()
            .map(|tally| tally.clone())
            .unwrap_or_default()
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        let Ok(latencies) = self.settle_latencies.read() else {
            return LatencyStats::default();
        };
        if latencies.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = latencies.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Records submitted per second since the collector was created
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_submitted.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let synthesized = self.records_synthesized.load(Ordering::Relaxed);
        let submitted = self.records_submitted.load(Ordering::Relaxed);
        let acked = self.deliveries_acked.load(Ordering::Relaxed);
        let failed = self.deliveries_failed.load(Ordering::Relaxed);
        let abandoned = self.deliveries_abandoned.load(Ordering::Relaxed);
        let unencodable = self.serialization_failures.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();
        let truth = self.ground_truth();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            TRANSACTION PRODUCER - PUBLISH SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Synthesized: {:>8}  │  Submitted: {:>8}  │ {:>7.1} tx/s ║",
            synthesized,
            submitted,
            self.get_throughput()
        );
        info!(
            "║ Delivered: {:>8}  Failed: {:>6}  Unacked: {:>6}  Bad: {:>4} ║",
            acked, failed, abandoned, unencodable
        );
        info!(
            "║ Settle Time (μs): mean={:>6} p50={:>6} p99={:>6} max={:>6} ║",
            latency.mean_us, latency.p50_us, latency.p99_us, latency.max_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Ground Truth: {:>6} legitimate, {:>6} fraudulent ({:>5.1}%)  ║",
            truth.legitimate,
            truth.fraudulent(),
            truth.fraud_rate() * 100.0
        );
        for strategy in FraudStrategy::ALL {
            let count = truth.by_strategy.get(&strategy).copied().unwrap_or(0);
            info!("║   {:30}: {:>6}                          ║", strategy.as_str(), count);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PublishMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Submit-to-settle time statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Prints periodic summaries while a long paced run is in progress
pub struct MetricsReporter {
    metrics: Arc<PublishMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PublishMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
