//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client for the asynchronous message ingress path
//! - `http` - HTTP server for the synchronous request ingress path
//! - `store` - Store API adapter (batch persistence boundary)
//! - `feed` - TCP listener for live subscriber connections
//! - `dead_letter` - JSONL file for batches that failed to persist
//! - `datasource` - file-based fake sensor reader (CSV)

pub mod datasource;
pub mod dead_letter;
pub mod feed;
pub mod http;
pub mod mqtt;
pub mod store;

// Re-export commonly used types
pub use datasource::FileDatasource;
pub use dead_letter::DeadLetter;
pub use feed::{start_feed_listener, FeedListenerConfig};
pub use store::{StoreApiAdapter, StoreSink};
