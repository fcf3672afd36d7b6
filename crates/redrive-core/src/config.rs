//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! `REDRIVE_*` environment variables. Every section is `#[serde(default)]`
//! so a partial file only overrides what it names.
//!
//! ```toml
//! [retry]
//! delays_secs = [5, 10, 20]
//! max_attempts = 3
//!
//! [queue]
//! max_receive_count = 3
//! visibility_timeout_secs = 30
//!
//! [worker]
//! concurrency = 4
//! concurrency_guard = "last_writer_wins"
//!
//! [logging]
//! format = "json"
//! filter = "info"
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;
use crate::domain::RetryPolicy;
use crate::domain::retry::{DEFAULT_DELAYS_SECS, DEFAULT_MAX_ATTEMPTS};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedriveConfig {
    pub retry: RetryConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

/// Backoff schedule and exhaustion threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub delays_secs: Vec<u64>,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_secs: DEFAULT_DELAYS_SECS.to_vec(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Queue substrate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Receives after which the substrate moves a message to the dead-letter
    /// queue. Should equal `retry.max_attempts`.
    pub max_receive_count: u32,
    pub visibility_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_receive_count: 3,
            visibility_timeout_secs: 30,
        }
    }
}

/// How the controller writes to the record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyGuard {
    /// Unconditional writes; the last write wins.
    #[default]
    LastWriterWins,

    /// Claim and completion are conditional on the version read.
    ConditionalUpdate,
}

impl FromStr for ConcurrencyGuard {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_writer_wins" | "lww" => Ok(Self::LastWriterWins),
            "conditional_update" | "conditional" | "cas" => Ok(Self::ConditionalUpdate),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub concurrency_guard: ConcurrencyGuard,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            concurrency_guard: ConcurrencyGuard::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,

    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
        }
    }
}

impl RedriveConfig {
    /// Defaults, then `path` (if any), then the environment; validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `REDRIVE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("REDRIVE_RETRY_DELAYS") {
            self.retry.delays_secs = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<u64>())
                .collect::<Result<_, _>>()
                .map_err(|_| invalid("REDRIVE_RETRY_DELAYS", &v))?;
        }
        if let Some(v) = lookup("REDRIVE_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse("REDRIVE_RETRY_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("REDRIVE_QUEUE_MAX_RECEIVE_COUNT") {
            self.queue.max_receive_count = parse("REDRIVE_QUEUE_MAX_RECEIVE_COUNT", &v)?;
        }
        if let Some(v) = lookup("REDRIVE_QUEUE_VISIBILITY_TIMEOUT_SECS") {
            self.queue.visibility_timeout_secs =
                parse("REDRIVE_QUEUE_VISIBILITY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("REDRIVE_WORKER_CONCURRENCY") {
            self.worker.concurrency = parse("REDRIVE_WORKER_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("REDRIVE_CONCURRENCY_GUARD") {
            self.worker.concurrency_guard = parse("REDRIVE_CONCURRENCY_GUARD", &v)?;
        }
        if let Some(v) = lookup("REDRIVE_LOG_FORMAT") {
            self.logging.format = parse("REDRIVE_LOG_FORMAT", &v)?;
        }
        if let Some(v) = lookup("REDRIVE_LOG_FILTER") {
            self.logging.filter = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.delays_secs.is_empty() {
            return Err(ConfigError::Invalid("retry.delays_secs must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be > 0".into()));
        }
        if self.queue.max_receive_count == 0 {
            return Err(ConfigError::Invalid("queue.max_receive_count must be > 0".into()));
        }
        if self.worker.concurrency == 0 {
            return Err(ConfigError::Invalid("worker.concurrency must be > 0".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(&self.retry.delays_secs, self.retry.max_attempts).ok_or_else(|| {
            ConfigError::Invalid("retry policy needs a delay and a non-zero threshold".into())
        })
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}
