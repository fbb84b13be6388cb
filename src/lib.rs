//! Transaction Synthesizer Library
//!
//! Simulates a stream of bank-card transactions with a configurable share of
//! fraudulent patterns, publishes each record to a keyed topic, and exposes
//! the feature-extraction boundary a downstream detector is expected to
//! accept.

pub mod api;
pub mod catalog;
pub mod config;
pub mod feature_extractor;
pub mod metrics;
pub mod producer;
pub mod synthesizer;
pub mod types;

pub use catalog::{FraudStrategy, StrategyCatalog};
pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use metrics::{PublishMetrics, PublishReport};
pub use producer::{DryRunProducer, NatsTopicProducer, PublishPipeline, TopicProducer};
pub use synthesizer::{FraudDecision, TransactionSynthesizer};
pub use types::{detection::DetectionRequest, transaction::TransactionRecord};
