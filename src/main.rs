//! Road telemetry hub
//!
//! Ingests labeled sensor readings over two paths - synchronous HTTP
//! requests and asynchronous MQTT messages - buffers them in a shared
//! FIFO, flushes fixed-size batches to the Store API, and fans each
//! message-path reading out to live TCP subscribers.
//!
//! Module structure:
//! - `domain/` - Sensor entities and the processed telemetry record
//! - `io/` - External interfaces (MQTT, HTTP, Store API, feed, datasource)
//! - `services/` - Business logic (classifier, buffer, ingest, subscribers)
//! - `infra/` - Infrastructure (Config, Metrics, Broker)

use clap::Parser;
use std::sync::Arc;
use telemetry_hub::infra::{Config, Metrics, PersistFailurePolicy};
use telemetry_hub::io::{start_feed_listener, DeadLetter, FeedListenerConfig, StoreApiAdapter};
use telemetry_hub::services::{Ingestor, SubscriberRegistry};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Road telemetry hub - buffered batch ingestion with live fan-out
#[derive(Parser, Debug)]
#[command(name = "telemetry-hub", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git_hash = %env!("GIT_HASH"),
        "telemetry-hub starting"
    );

    // Parse command line arguments using clap
    let args = Args::parse();

    // Load configuration from TOML file
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        batch_size = %config.batch_size(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        mqtt_topic = %config.mqtt_topic(),
        http_port = %config.http_port(),
        store_base_url = %config.store_base_url(),
        subscribers_port = %config.subscribers_port(),
        "config_loaded"
    );

    // Start embedded MQTT broker (if enabled)
    telemetry_hub::infra::broker::start_embedded_broker(&config);

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create shared components
    let metrics = Arc::new(Metrics::new());
    let store = Arc::new(StoreApiAdapter::new(&config)?);
    let dead_letter = match config.on_persist_failure() {
        PersistFailurePolicy::DeadLetter => Some(DeadLetter::new(config.dead_letter_file())),
        _ => None,
    };
    let ingestor = Arc::new(Ingestor::new(
        config.batch_size(),
        store,
        config.on_persist_failure(),
        config.retry_attempts(),
        dead_letter,
        metrics.clone(),
    ));
    let registry = Arc::new(SubscriberRegistry::new(metrics.clone()));

    // Start MQTT message-path ingress
    let mqtt_config = config.clone();
    let mqtt_ingestor = ingestor.clone();
    let mqtt_registry = registry.clone();
    let mqtt_metrics = metrics.clone();
    let mqtt_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = telemetry_hub::io::mqtt::start_mqtt_ingest(
            &mqtt_config,
            mqtt_ingestor,
            mqtt_registry,
            mqtt_metrics,
            mqtt_shutdown,
        )
        .await
        {
            tracing::error!(error = %e, "mqtt_ingest_failed");
        }
    });

    // Start HTTP request-path ingress
    let http_port = config.http_port();
    let http_ingestor = ingestor.clone();
    let http_metrics = metrics.clone();
    let http_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = telemetry_hub::io::http::start_http_ingest(
            http_port,
            http_ingestor,
            http_metrics,
            http_shutdown,
        )
        .await
        {
            tracing::error!(error = %e, "http_ingest_failed");
        }
    });

    // Start live feed listener for subscribers
    let feed_config = FeedListenerConfig {
        port: config.subscribers_port(),
        enabled: config.subscribers_enabled(),
    };
    let feed_registry = registry.clone();
    let feed_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = start_feed_listener(feed_config, feed_registry, feed_shutdown).await {
            tracing::error!(error = %e, "feed_listener_failed");
        }
    });

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_ingestor = ingestor.clone();
    let metrics_registry = registry.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            let summary =
                metrics_clone.summary(metrics_ingestor.pending(), metrics_registry.count());
            summary.log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Wait for the shutdown signal
    let mut shutdown = shutdown_rx;
    while shutdown.changed().await.is_ok() {
        if *shutdown.borrow() {
            break;
        }
    }

    info!("telemetry-hub shutdown complete");
    Ok(())
}
