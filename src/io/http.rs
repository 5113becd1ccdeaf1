//! HTTP server for the synchronous request ingress path
//!
//! Exposes POST /processed_agent_data/ accepting one JSON reading per
//! request, plus a /health probe. Uses hyper for the HTTP server.

use crate::infra::metrics::Metrics;
use crate::services::ingest::Ingestor;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

fn json_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    ingestor: Arc<Ingestor>,
    metrics: Arc<Metrics>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/processed_agent_data/" | "/processed_agent_data") => {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(error = %e, "ingest_body_read_failed");
                    return Ok(json_response(
                        StatusCode::BAD_REQUEST,
                        r#"{"status":"error","detail":"unreadable body"}"#,
                    ));
                }
            };

            match serde_json::from_slice::<crate::domain::types::ProcessedAgentData>(&body) {
                Ok(entry) => {
                    metrics.record_request_ingested();
                    debug!(road_state = %entry.road_state, "http_reading_accepted");
                    ingestor.ingest(entry).await;
                    Ok(json_response(StatusCode::OK, r#"{"status":"ok"}"#))
                }
                Err(e) => {
                    warn!(error = %e, "ingest_payload_rejected");
                    Ok(json_response(
                        StatusCode::BAD_REQUEST,
                        r#"{"status":"error","detail":"malformed payload"}"#,
                    ))
                }
            }
        }
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Start the HTTP ingest server
pub async fn start_http_ingest(
    port: u16,
    ingestor: Arc<Ingestor>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = %port, "http_ingest_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let ingestor = ingestor.clone();
                        let metrics = metrics.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let ingestor = ingestor.clone();
                                let metrics = metrics.clone();
                                async move { handle_request(req, ingestor, metrics).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_ingest_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_ingest_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_ingest_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
