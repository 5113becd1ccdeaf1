//! Domain models - sensor readings and the processed telemetry record
//!
//! This module contains the canonical data types used throughout the system:
//! - `AgentData` - one sampled sensor instant (accelerometer + GPS + timestamp)
//! - `ProcessedAgentData` - the labeled record that gets buffered, stored,
//!   and broadcast
//! - `RoadState` - the classifier's output label

pub mod types;

// Re-export commonly used types
pub use types::{
    AccelerometerData, AgentData, GpsData, InputData, ParkingData, ProcessedAgentData, RoadState,
};
