//! Configuration management for the transaction producer and detection API

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Legacy variable holding the broker address
pub const BOOTSTRAP_SERVERS_VAR: &str = "KAFKA_BOOTSTRAP_SERVERS";

/// Legacy variable holding the number of records to generate
pub const NUM_TRANSACTIONS_VAR: &str = "NUM_TRANSACTIONS";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub generator: GeneratorConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Broker connection and delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker address
    pub bootstrap_servers: String,
    /// Topic every record is published to
    pub topic: String,
    /// Client name reported to the broker
    pub client_name: String,
    /// Upper bound on the final flush barrier, in milliseconds
    pub linger_ms: u64,
    /// Maximum number of unacknowledged records
    pub max_in_flight: usize,
    /// Create the backing stream for the topic if it is missing. JetStream
    /// publishes are never acknowledged without one.
    #[serde(default = "default_ensure_stream")]
    pub ensure_stream: bool,
    /// Fall back to dry-run mode when the broker is unreachable
    #[serde(default)]
    pub dry_run_on_connect_failure: bool,
}

fn default_ensure_stream() -> bool {
    true
}

impl BrokerConfig {
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

/// Transaction generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of records per run
    pub count: u64,
    /// Probability that a record follows a fraud strategy
    pub fraud_rate: f64,
    /// Seed for a reproducible run
    #[serde(default)]
    pub seed: Option<u64>,
    /// Pause between submissions, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

impl GeneratorConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Detection API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Install the global subscriber. When `RUST_LOG` is set it replaces the
    /// configured level entirely.
    pub fn init(&self, target: &str) -> Result<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => self.default_filter(target)?,
        };

        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let installed = match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        };

        installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
    }

    fn default_filter(&self, target: &str) -> Result<EnvFilter> {
        Ok(EnvFilter::default()
            .add_directive(format!("{target}={}", self.level).parse()?)
            .add_directive(format!("transaction_synthesizer={}", self.level).parse()?))
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_with_env(None, |key| std::env::var(key).ok())
    }

    /// Load configuration from a specific file and the environment
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(Some(path.as_ref()), |key| std::env::var(key).ok())
    }

    /// Layered load: defaults, file, `APP__*` variables, then the legacy
    /// variables looked up through `env`.
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match path {
            Some(path) => Self::load_sources(path, true, env),
            None => Self::load_sources(Path::new(DEFAULT_CONFIG_PATH), false, env),
        }
    }

    fn load_sources<F>(path: &Path, required: bool, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = File::from(path).required(required);

        let count = env(NUM_TRANSACTIONS_VAR)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{NUM_TRANSACTIONS_VAR} must be a whole number, got '{raw}'"))
            })
            .transpose()?;

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("broker.bootstrap_servers", env(BOOTSTRAP_SERVERS_VAR))?
            .set_override_option("generator.count", count)?
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.broker.topic.trim().is_empty() {
            bail!("broker.topic must not be empty");
        }
        if self.broker.max_in_flight == 0 {
            bail!("broker.max_in_flight must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.generator.fraud_rate) {
            bail!(
                "generator.fraud_rate must be within [0, 1], got {}",
                self.generator.fraud_rate
            );
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig {
                bootstrap_servers: "localhost:29092".to_string(),
                topic: "transactions".to_string(),
                client_name: "transaction-producer".to_string(),
                linger_ms: 10_000,
                max_in_flight: 1_000,
                ensure_stream: true,
                dry_run_on_connect_failure: false,
            },
            generator: GeneratorConfig {
                count: 100,
                fraud_rate: 0.20,
                seed: None,
                delay_ms: 0,
            },
            api: ApiConfig {
                bind_addr: "0.0.0.0:8000".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}
