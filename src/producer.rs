//! Publishing synthesized transactions to the broker
//!
//! Records are handed to a [`TopicProducer`] one by one; every submission
//! yields a [`DeliveryFuture`] that resolves once the broker acknowledges the
//! record. Waiting on acks, whether for room in the in-flight queue or at the
//! final flush barrier, is bounded by the configured linger.

use crate::config::BrokerConfig;
use crate::metrics::{PublishMetrics, PublishReport};
use crate::synthesizer::TransactionSynthesizer;
use async_nats::jetstream;
use async_nats::{Client, HeaderMap};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Local;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Header carrying the record key
pub const KEY_HEADER: &str = "Message-Key";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to connect to broker at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("failed to prepare topic {topic}: {reason}")]
    Topic { topic: String, reason: String },

    #[error("failed to serialize transaction {transaction_id}")]
    Serialize {
        transaction_id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to submit record with key {key}: {reason}")]
    Submit { key: String, reason: String },

    #[error("delivery of record with key {key} failed: {reason}")]
    Delivery { key: String, reason: String },

    #[error("flush failed: {0}")]
    Flush(String),
}

/// Broker acknowledgment of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub key: String,
    pub sequence: u64,
}

/// Resolves when the broker acknowledges or rejects a submitted record.
pub type DeliveryFuture = BoxFuture<'static, Result<Delivery, PublishError>>;

/// Keyed topic producer.
#[async_trait]
pub trait TopicProducer: Send + Sync {
    /// Hand a record to the client. Returns once the record is buffered;
    /// the acknowledgment arrives through the returned future.
    async fn submit(&self, topic: &str, key: &str, payload: Bytes) -> Result<DeliveryFuture, PublishError>;

    /// Push out anything still buffered in the client.
    async fn flush(&self) -> Result<(), PublishError>;
}

/// JetStream-backed producer. The topic is the subject; the key travels in
/// the [`KEY_HEADER`] header.
#[derive(Clone)]
pub struct NatsTopicProducer {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsTopicProducer {
    pub fn new(client: Client) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self { client, jetstream }
    }

    /// Connect to the configured broker
    pub async fn connect(config: &BrokerConfig) -> Result<Self, PublishError> {
        let client = async_nats::ConnectOptions::new()
            .name(&config.client_name)
            .connect(config.bootstrap_servers.as_str())
            .await
            .map_err(|e| PublishError::Connect {
                addr: config.bootstrap_servers.clone(),
                reason: e.to_string(),
            })?;

        info!(addr = %config.bootstrap_servers, "Connected to broker");
        Ok(Self::new(client))
    }

    /// Make sure a stream captures the topic
    pub async fn ensure_topic(&self, topic: &str) -> Result<(), PublishError> {
        let stream = stream_name(topic);
        self.jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: stream.clone(),
                subjects: vec![topic.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|e| PublishError::Topic {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        info!(topic = %topic, stream = %stream, "Topic stream ready");
        Ok(())
    }
}

#[async_trait]
impl TopicProducer for NatsTopicProducer {
    async fn submit(&self, topic: &str, key: &str, payload: Bytes) -> Result<DeliveryFuture, PublishError> {
        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, key);

        let ack = self
            .jetstream
            .publish_with_headers(topic.to_string(), headers, payload)
            .await
            .map_err(|e| PublishError::Submit {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let topic = topic.to_string();
        let key = key.to_string();
        Ok(Box::pin(async move {
            match ack.await {
                Ok(ack) => Ok(Delivery {
                    topic,
                    key,
                    sequence: ack.sequence,
                }),
                Err(e) => Err(PublishError::Delivery {
                    key,
                    reason: e.to_string(),
                }),
            }
        }))
    }

    async fn flush(&self) -> Result<(), PublishError> {
        self.client
            .flush()
            .await
            .map_err(|e| PublishError::Flush(e.to_string()))
    }
}

/// Logs records instead of sending them; every record is acknowledged
/// immediately.
#[derive(Debug, Default)]
pub struct DryRunProducer {
    sequence: AtomicU64,
}

impl DryRunProducer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopicProducer for DryRunProducer {
    async fn submit(&self, topic: &str, key: &str, payload: Bytes) -> Result<DeliveryFuture, PublishError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        if sequence == 1 || sequence % 10 == 0 {
            let pretty = serde_json::from_slice::<serde_json::Value>(&payload)
                .and_then(|value| serde_json::to_string_pretty(&value))
                .unwrap_or_else(|_| String::from_utf8_lossy(&payload).into_owned());
            info!(topic = %topic, key = %key, "Sample transaction {}:\n{}", sequence, pretty);
        } else {
            debug!(topic = %topic, key = %key, sequence, "Dry-run record");
        }

        let delivery = Delivery {
            topic: topic.to_string(),
            key: key.to_string(),
            sequence,
        };
        Ok(Box::pin(futures::future::ready(Ok::<_, PublishError>(delivery))))
    }

    async fn flush(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Synthesizes records and publishes them keyed by account number.
pub struct PublishPipeline {
    producer: Arc<dyn TopicProducer>,
    synthesizer: TransactionSynthesizer,
    metrics: Arc<PublishMetrics>,
    topic: String,
    linger: Duration,
    max_in_flight: usize,
    delay: Duration,
}

impl PublishPipeline {
    pub fn new(
        producer: Arc<dyn TopicProducer>,
        synthesizer: TransactionSynthesizer,
        broker: &BrokerConfig,
    ) -> Self {
        Self {
            producer,
            synthesizer,
            metrics: Arc::new(PublishMetrics::new()),
            topic: broker.topic.clone(),
            linger: broker.linger(),
            max_in_flight: broker.max_in_flight.max(1),
            delay: Duration::ZERO,
        }
    }

    /// Pause between submissions
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PublishMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<PublishMetrics> {
        &self.metrics
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Synthesize and publish `count` records, then wait on the flush
    /// barrier. Per-record failures are logged and counted, never retried
    /// and never returned as an error.
    pub async fn publish<R: Rng + Send + ?Sized>(&self, count: u64, rng: &mut R) -> PublishReport {
        let mut report = PublishReport::default();
        let mut pending = FuturesUnordered::new();

        info!(count, topic = %self.topic, "Starting to publish transactions");

        for i in 0..count {
            let labelled = self
                .synthesizer
                .synthesize_labelled(rng, Local::now().date_naive());
            self.metrics.record_synthesized(labelled.decision);
            let record = labelled.record;

            let payload = match serde_json::to_vec(&record) {
                Ok(payload) => payload,
                Err(source) => {
                    let err = PublishError::Serialize {
                        transaction_id: record.transaction_id,
                        source,
                    };
                    warn!(error = %err, "Skipping transaction");
                    self.metrics.record_serialization_failure();
                    report.serialization_failures += 1;
                    continue;
                }
            };

            // Bounded outbound queue. Every queued ack carries its own linger
            // deadline, so this wait ends even when acks stall.
            while pending.len() >= self.max_in_flight {
                match pending.next().await {
                    Some((outcome, settled_in)) => self.settle(outcome, settled_in, &mut report),
                    None => break,
                }
            }

            match self
                .producer
                .submit(&self.topic, record.key(), Bytes::from(payload))
                .await
            {
                Ok(delivery) => {
                    report.submitted += 1;
                    self.metrics.record_submitted();
                    // The deadline starts at submission, not at first poll.
                    let submitted_at = Instant::now();
                    let acked = tokio::time::timeout(self.linger, delivery);
                    pending.push(async move { (acked.await.ok(), submitted_at.elapsed()) });
                }
                Err(e) => {
                    warn!(
                        transaction_id = %record.transaction_id,
                        error = %e,
                        "Failed to deliver message"
                    );
                    self.metrics.record_failed();
                    report.failed += 1;
                }
            }

            if (i + 1) % 10 == 0 {
                info!(
                    "Published {}/{} transactions ({} acknowledged so far)",
                    i + 1,
                    count,
                    report.delivered
                );
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        // Flush barrier
        if let Err(e) = self.producer.flush().await {
            warn!(error = %e, "Flush failed; waiting on outstanding acknowledgments anyway");
        }

        let barrier = async {
            while let Some((outcome, settled_in)) = pending.next().await {
                self.settle(outcome, settled_in, &mut report);
            }
        };
        let drained = tokio::time::timeout(self.linger, barrier).await;

        if drained.is_err() {
            let abandoned = pending.len() as u64;
            warn!(
                abandoned,
                linger_ms = self.linger.as_millis() as u64,
                "Linger elapsed with unacknowledged records"
            );
            self.metrics.record_abandoned(abandoned);
            report.unacknowledged += abandoned;
        }

        info!(
            submitted = report.submitted,
            delivered = report.delivered,
            failed = report.failed,
            unacknowledged = report.unacknowledged,
            "Publish complete"
        );

        report
    }

    /// `None` means the ack did not arrive within the linger period.
    fn settle(
        &self,
        outcome: Option<Result<Delivery, PublishError>>,
        settled_in: Duration,
        report: &mut PublishReport,
    ) {
        match outcome {
            Some(Ok(delivery)) => {
                debug!(
                    topic = %delivery.topic,
                    key = %delivery.key,
                    sequence = delivery.sequence,
                    "Message produced"
                );
                self.metrics.record_delivered(settled_in);
                report.delivered += 1;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Failed to deliver message");
                self.metrics.record_failed();
                report.failed += 1;
            }
            None => {
                warn!(
                    linger_ms = self.linger.as_millis() as u64,
                    "Acknowledgment not received within linger; abandoning record"
                );
                self.metrics.record_abandoned(1);
                report.unacknowledged += 1;
            }
        }
    }
}

/// Stream names may not contain subject tokens.
fn stream_name(topic: &str) -> String {
    topic
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}
