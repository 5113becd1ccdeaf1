//! Integration tests for configuration loading

use std::io::Write;
use telemetry_hub::infra::{Config, PersistFailurePolicy};
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[ingest]
batch_size = 3
on_persist_failure = "dead-letter"
retry_attempts = 5
dead_letter_file = "spool/failed.jsonl"

[mqtt]
host = "test-host"
port = 1884
topic = "test/processed"

[http]
port = 8080

[store]
base_url = "http://store.test:9000"
timeout_ms = 2500

[subscribers]
enabled = false
port = 9100

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.batch_size(), 3);
    assert_eq!(config.on_persist_failure(), PersistFailurePolicy::DeadLetter);
    assert_eq!(config.retry_attempts(), 5);
    assert_eq!(config.dead_letter_file(), "spool/failed.jsonl");
    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_topic(), "test/processed");
    assert_eq!(config.http_port(), 8080);
    assert_eq!(config.store_base_url(), "http://store.test:9000");
    assert_eq!(config.store_timeout_ms(), 2500);
    assert!(!config.subscribers_enabled());
    assert_eq!(config.subscribers_port(), 9100);
    assert_eq!(config.metrics_interval_secs(), 15);
}

#[test]
fn test_optional_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();

    // Only the required sections; ingest/http/subscribers/broker/metrics
    // fall back to their defaults
    let config_content = r#"
[mqtt]
host = "localhost"
port = 1883
topic = "agent/processed"

[store]
base_url = "http://localhost:8001"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.batch_size(), 10);
    assert_eq!(config.on_persist_failure(), PersistFailurePolicy::Drop);
    assert_eq!(config.http_port(), 8000);
    assert_eq!(config.store_timeout_ms(), 5000);
    assert!(config.subscribers_enabled());
    assert_eq!(config.subscribers_port(), 9001);
    assert_eq!(config.metrics_interval_secs(), 10);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.batch_size(), 10);
    assert_eq!(config.on_persist_failure(), PersistFailurePolicy::Drop);
}
