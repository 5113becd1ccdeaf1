//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument,
//! defaulting to config/dev.toml. A missing or unparsable file falls back
//! to defaults with a warning on stderr.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// What to do with a drained batch when the store call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistFailurePolicy {
    /// Log and discard (source behavior, at-most-once).
    Drop,
    /// Re-attempt a bounded number of times, then discard.
    Retry,
    /// Append the batch to a JSONL dead-letter file.
    DeadLetter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_persist_failure_policy")]
    pub on_persist_failure: PersistFailurePolicy,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_dead_letter_file")]
    pub dead_letter_file: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            on_persist_failure: default_persist_failure_policy(),
            retry_attempts: default_retry_attempts(),
            dead_letter_file: default_dead_letter_file(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_persist_failure_policy() -> PersistFailurePolicy {
    PersistFailurePolicy::Drop
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_dead_letter_file() -> String {
    "dead_letter.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: default_http_port() }
    }
}

fn default_http_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_store_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribersConfig {
    #[serde(default = "default_subscribers_enabled")]
    pub enabled: bool,
    #[serde(default = "default_subscribers_port")]
    pub port: u16,
}

impl Default for SubscribersConfig {
    fn default() -> Self {
        Self { enabled: default_subscribers_enabled(), port: default_subscribers_port() }
    }
}

fn default_subscribers_enabled() -> bool {
    true
}

fn default_subscribers_port() -> u16 {
    9001
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_enabled")]
    pub enabled: bool,
    #[serde(default = "default_broker_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: default_broker_enabled(),
            bind_address: default_broker_bind_address(),
            port: default_broker_port(),
        }
    }
}

fn default_broker_enabled() -> bool {
    true
}

fn default_broker_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub subscribers: SubscribersConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    batch_size: usize,
    on_persist_failure: PersistFailurePolicy,
    retry_attempts: u32,
    dead_letter_file: String,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_topic: String,
    http_port: u16,
    store_base_url: String,
    store_timeout_ms: u64,
    subscribers_enabled: bool,
    subscribers_port: u16,
    broker_enabled: bool,
    broker_bind_address: String,
    broker_port: u16,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            on_persist_failure: default_persist_failure_policy(),
            retry_attempts: default_retry_attempts(),
            dead_letter_file: default_dead_letter_file(),
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_topic: "agent/processed".to_string(),
            http_port: default_http_port(),
            store_base_url: "http://localhost:8001".to_string(),
            store_timeout_ms: default_store_timeout_ms(),
            subscribers_enabled: default_subscribers_enabled(),
            subscribers_port: default_subscribers_port(),
            broker_enabled: default_broker_enabled(),
            broker_bind_address: default_broker_bind_address(),
            broker_port: default_broker_port(),
            metrics_interval_secs: default_metrics_interval(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            batch_size: toml_config.ingest.batch_size,
            on_persist_failure: toml_config.ingest.on_persist_failure,
            retry_attempts: toml_config.ingest.retry_attempts,
            dead_letter_file: toml_config.ingest.dead_letter_file,
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_topic: toml_config.mqtt.topic,
            http_port: toml_config.http.port,
            store_base_url: toml_config.store.base_url,
            store_timeout_ms: toml_config.store.timeout_ms,
            subscribers_enabled: toml_config.subscribers.enabled,
            subscribers_port: toml_config.subscribers.port,
            broker_enabled: toml_config.broker.enabled,
            broker_bind_address: toml_config.broker.bind_address,
            broker_port: toml_config.broker.port,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn on_persist_failure(&self) -> PersistFailurePolicy {
        self.on_persist_failure
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn dead_letter_file(&self) -> &str {
        &self.dead_letter_file
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_topic(&self) -> &str {
        &self.mqtt_topic
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn store_base_url(&self) -> &str {
        &self.store_base_url
    }

    pub fn store_timeout_ms(&self) -> u64 {
        self.store_timeout_ms
    }

    pub fn subscribers_enabled(&self) -> bool {
        self.subscribers_enabled
    }

    pub fn subscribers_port(&self) -> u16 {
        self.subscribers_port
    }

    pub fn broker_enabled(&self) -> bool {
        self.broker_enabled
    }

    pub fn broker_bind_address(&self) -> &str {
        &self.broker_bind_address
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the batch size
    #[cfg(test)]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.batch_size(), 10);
        assert_eq!(config.on_persist_failure(), PersistFailurePolicy::Drop);
        assert_eq!(config.mqtt_host(), "localhost");
        assert_eq!(config.mqtt_port(), 1883);
        assert_eq!(config.mqtt_topic(), "agent/processed");
        assert_eq!(config.http_port(), 8000);
        assert_eq!(config.store_base_url(), "http://localhost:8001");
        assert_eq!(config.subscribers_port(), 9001);
        assert_eq!(config.metrics_interval_secs(), 10);
    }

    #[test]
    fn test_persist_failure_policy_kebab_case() {
        #[derive(Deserialize)]
        struct Holder {
            policy: PersistFailurePolicy,
        }

        let holder: Holder = toml::from_str("policy = \"dead-letter\"").unwrap();
        assert_eq!(holder.policy, PersistFailurePolicy::DeadLetter);
        let holder: Holder = toml::from_str("policy = \"retry\"").unwrap();
        assert_eq!(holder.policy, PersistFailurePolicy::Retry);
        let holder: Holder = toml::from_str("policy = \"drop\"").unwrap();
        assert_eq!(holder.policy, PersistFailurePolicy::Drop);
    }

    #[test]
    fn test_with_batch_size_builder() {
        let config = Config::default().with_batch_size(3);
        assert_eq!(config.batch_size(), 3);
    }
}
