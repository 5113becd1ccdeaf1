//! Infrastructure - configuration, metrics, and broker
//!
//! This module contains infrastructure concerns:
//! - `config` - application configuration (TOML loading, defaults)
//! - `metrics` - lock-free counters and the periodic summary
//! - `broker` - embedded MQTT broker (rumqttd)

pub mod broker;
pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::{Config, PersistFailurePolicy};
pub use metrics::Metrics;
