//! MQTT client for the asynchronous message ingress path
//!
//! Subscribes to the agent topic and feeds each well-formed payload
//! through the shared ingest operation, then broadcasts the raw payload to
//! live subscribers. A payload that fails to deserialize is logged and
//! discarded; it never reaches the buffer or the subscribers.

use crate::domain::types::ProcessedAgentData;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::ingest::Ingestor;
use crate::services::subscribers::SubscriberRegistry;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Parse one serialized reading from the wire.
pub fn parse_processed_payload(json: &str) -> serde_json::Result<ProcessedAgentData> {
    serde_json::from_str(json)
}

/// Start the MQTT ingress client.
///
/// Runs until the shutdown signal flips. Broker errors are logged and the
/// eventloop is retried after a short pause.
pub async fn start_mqtt_ingest(
    config: &Config,
    ingestor: Arc<Ingestor>,
    registry: Arc<SubscriberRegistry>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client_id = format!("telemetry-hub-{}", std::process::id());
    let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
    client.subscribe(config.mqtt_topic(), QoS::AtMostOnce).await?;

    info!(
        topic = %config.mqtt_topic(),
        host = %config.mqtt_host(),
        port = %config.mqtt_port(),
        "mqtt_ingest_subscribed"
    );

    loop {
        tokio::select! {
            // Check for shutdown signal
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_ingest_shutdown");
                    return Ok(());
                }
            }
            // Process MQTT events
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let topic = publish.topic.clone();
                        match std::str::from_utf8(&publish.payload) {
                            Ok(json) => {
                                handle_payload(json, &topic, &ingestor, &registry, &metrics).await;
                            }
                            Err(e) => {
                                metrics.record_malformed_payload();
                                warn!(topic = %topic, error = %e, "malformed_payload_discarded: invalid utf-8");
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("mqtt_ingest_connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "mqtt_ingest_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

/// Ingest one raw payload and fan it out.
///
/// The broadcast carries the raw message payload, and only the message
/// path triggers it.
async fn handle_payload(
    json: &str,
    topic: &str,
    ingestor: &Ingestor,
    registry: &SubscriberRegistry,
    metrics: &Metrics,
) {
    let entry = match parse_processed_payload(json) {
        Ok(entry) => entry,
        Err(e) => {
            metrics.record_malformed_payload();
            warn!(topic = %topic, error = %e, "malformed_payload_discarded");
            return;
        }
    };

    metrics.record_message_ingested();
    debug!(topic = %topic, road_state = %entry.road_state, "mqtt_reading_accepted");
    ingestor.ingest(entry).await;

    let delivered = registry.broadcast(json);
    debug!(delivered = %delivered, "reading_broadcast");
}
