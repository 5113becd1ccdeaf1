//! Agent simulator - replays CSV sensor data to the MQTT topic
//!
//! Reads the file datasource, classifies each sample into a road-state
//! label, and publishes the resulting ProcessedAgentData JSON to the
//! configured topic at a fixed interval. Stands in for a vehicle agent
//! during development.

use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use telemetry_hub::infra::Config;
use telemetry_hub::io::FileDatasource;
use telemetry_hub::services::process_agent_data;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Agent simulator - publishes classified readings from CSV files
#[derive(Parser, Debug)]
#[command(name = "agent-sim", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Accelerometer CSV file (columns: x, y, z)
    #[arg(long, default_value = "data/accelerometer.csv")]
    accelerometer: String,

    /// GPS CSV file (columns: longitude, latitude)
    #[arg(long, default_value = "data/gps.csv")]
    gps: String,

    /// Parking CSV file (column: empty_count)
    #[arg(long, default_value = "data/parking.csv")]
    parking: String,

    /// Delay between published readings in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Number of readings to publish (0 = run until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    count: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let mut datasource = FileDatasource::new(&args.accelerometer, &args.gps, &args.parking)?;

    let client_id = format!("agent-sim-{}", std::process::id());
    let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);

    // Drive the eventloop in the background
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("agent_sim_connected");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "agent_sim_mqtt_error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    let topic = config.mqtt_topic().to_string();
    info!(
        topic = %topic,
        host = %config.mqtt_host(),
        port = %config.mqtt_port(),
        interval_ms = %args.interval_ms,
        "agent_sim_started"
    );

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms));
    let mut published = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let input = datasource.read()?;
                let processed = process_agent_data(input);
                let payload = serde_json::to_string(&processed)?;

                client.publish(&topic, QoS::AtMostOnce, false, payload.as_bytes()).await?;
                published += 1;
                debug!(
                    seq = %published,
                    road_state = %processed.road_state,
                    "reading_published"
                );

                if args.count > 0 && published >= args.count {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("agent_sim_interrupted");
                break;
            }
        }
    }

    info!(published = %published, "agent_sim_done");
    Ok(())
}
