//! TCP listener for live subscriber connections
//!
//! Each accepted connection joins the subscriber registry with a bounded
//! outbound queue. Inbound bytes are ignored; the read half only serves to
//! detect disconnect. Outbound traffic is one JSON line per broadcast
//! payload. Membership lasts from accept to disconnect.

use crate::services::subscribers::{SubscriberRegistry, SUBSCRIBER_CHANNEL_CAPACITY};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Feed listener configuration
#[derive(Debug, Clone)]
pub struct FeedListenerConfig {
    pub port: u16,
    pub enabled: bool,
}

impl Default for FeedListenerConfig {
    fn default() -> Self {
        Self { port: 9001, enabled: true }
    }
}

/// Start the live feed TCP listener
pub async fn start_feed_listener(
    config: FeedListenerConfig,
    registry: Arc<SubscriberRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !config.enabled {
        info!("feed_listener_disabled");
        return Ok(());
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(port = %config.port, "feed_listener_started");

    loop {
        tokio::select! {
            // Check for shutdown
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("feed_listener_shutdown");
                    return Ok(());
                }
            }
            // Accept new connections
            result = listener.accept() => {
                match result {
                    Ok((socket, addr)) => {
                        let registry = registry.clone();
                        tokio::spawn(async move {
                            handle_subscriber(socket, addr, registry).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "feed_listener_accept_failed");
                    }
                }
            }
        }
    }
}

async fn handle_subscriber(
    socket: tokio::net::TcpStream,
    addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
) {
    let (read_half, mut write_half) = socket.into_split();
    let (tx, mut outbound) = mpsc::channel::<String>(SUBSCRIBER_CHANNEL_CAPACITY);
    let id = registry.join(tx);
    info!(subscriber = %id, peer = %addr, "subscriber_joined");

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        tokio::select! {
            // Inbound traffic is ignored; EOF or error means disconnect
            result = reader.read_line(&mut line) => {
                match result {
                    Ok(0) | Err(_) => break,
                    Ok(_) => line.clear(),
                }
            }
            // Deliver broadcast payloads, one JSON line each
            payload = outbound.recv() => {
                let Some(payload) = payload else { break };
                if write_half.write_all(payload.as_bytes()).await.is_err() {
                    break;
                }
                if write_half.write_all(b"\n").await.is_err() {
                    break;
                }
            }
        }
    }

    registry.leave(id);
    debug!(subscriber = %id, peer = %addr, "subscriber_left");
}
