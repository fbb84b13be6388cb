//! Transaction Producer - Main Entry Point
//!
//! Synthesizes card transactions, injects fraud patterns and publishes each
//! record to the `transactions` topic keyed by account number.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use transaction_synthesizer::{
    config::AppConfig,
    metrics::{MetricsReporter, PublishMetrics},
    producer::{DryRunProducer, NatsTopicProducer, PublishPipeline, TopicProducer},
    StrategyCatalog, TransactionSynthesizer,
};

#[derive(Debug, Parser)]
#[command(name = "transaction-producer", version, about = "Publish synthetic card transactions")]
struct Args {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of transactions to publish
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Broker address
    #[arg(long)]
    bootstrap_servers: Option<String>,

    #[arg(long)]
    topic: Option<String>,

    /// Share of fraudulent transactions, 0.0 to 1.0
    #[arg(long)]
    fraud_rate: Option<f64>,

    /// Seed for a reproducible stream
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between submissions in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Log transactions instead of publishing them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(count) = self.count {
            config.generator.count = count;
        }
        if let Some(servers) = &self.bootstrap_servers {
            config.broker.bootstrap_servers = servers.clone();
        }
        if let Some(topic) = &self.topic {
            config.broker.topic = topic.clone();
        }
        if let Some(fraud_rate) = self.fraud_rate {
            config.generator.fraud_rate = fraud_rate;
        }
        if self.seed.is_some() {
            config.generator.seed = self.seed;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.generator.delay_ms = delay_ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    args.apply(&mut config);
    config.validate()?;

    // Initialize logging
    config.logging.init("transaction_producer")?;

    info!("Starting Transaction Producer");
    info!(
        bootstrap_servers = %config.broker.bootstrap_servers,
        topic = %config.broker.topic,
        count = config.generator.count,
        fraud_rate = config.generator.fraud_rate,
        seed = ?config.generator.seed,
        "Configuration loaded"
    );

    let synthesizer =
        TransactionSynthesizer::with_fraud_rate(StrategyCatalog::new(), config.generator.fraud_rate)?;

    let producer: Arc<dyn TopicProducer> = if args.dry_run {
        info!("Running in dry-run mode (no broker connection)");
        Arc::new(DryRunProducer::new())
    } else {
        match NatsTopicProducer::connect(&config.broker).await {
            Ok(producer) => {
                if config.broker.ensure_stream {
                    producer.ensure_topic(&config.broker.topic).await?;
                }
                Arc::new(producer)
            }
            Err(e) if config.broker.dry_run_on_connect_failure => {
                warn!(error = %e, "Failed to connect to broker. Running in dry-run mode.");
                Arc::new(DryRunProducer::new())
            }
            Err(e) => return Err(e).context("Broker unavailable"),
        }
    };

    let metrics = Arc::new(PublishMetrics::new());
    let pipeline = PublishPipeline::new(producer, synthesizer, &config.broker)
        .with_delay(config.generator.delay())
        .with_metrics(metrics.clone());

    // Paced runs can take a while; report along the way.
    let reporter = (config.generator.delay_ms > 0)
        .then(|| tokio::spawn(MetricsReporter::new(metrics.clone(), 30).start()));

    let mut rng = match config.generator.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = pipeline.publish(config.generator.count, &mut rng).await;

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    metrics.print_summary();

    if !report.is_clean() {
        warn!(
            failed = report.failed,
            unacknowledged = report.unacknowledged,
            serialization_failures = report.serialization_failures,
            "{} of {} transactions were not delivered",
            report.failure_count(),
            config.generator.count
        );
    }

    Ok(())
}
