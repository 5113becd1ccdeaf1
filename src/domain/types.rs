//! Shared types for the telemetry hub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accelerometer sample, three signed axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub latitude: f64,
    pub longitude: f64,
}

/// Parking occupancy sample. Carries the GPS fix taken at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkingData {
    pub empty_count: f64,
    pub gps: GpsData,
}

/// One sampled sensor instant as emitted by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub accelerometer: AccelerometerData,
    pub gps: GpsData,
    pub timestamp: DateTime<Utc>,
}

/// Raw sampled instant before classification: sensor data plus the
/// parking reading the road-state label is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    pub accelerometer: AccelerometerData,
    pub gps: GpsData,
    pub parking: ParkingData,
    pub timestamp: DateTime<Utc>,
}

/// Road-state label derived from parking occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadState {
    Good,
    Bad,
}

impl RoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoadState::Good => "good",
            RoadState::Bad => "bad",
        }
    }
}

impl std::fmt::Display for RoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit that is buffered, batch-persisted, and broadcast to live
/// subscribers. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAgentData {
    pub road_state: RoadState,
    pub agent_data: AgentData,
}

impl ProcessedAgentData {
    pub fn new(road_state: RoadState, agent_data: AgentData) -> Self {
        Self { road_state, agent_data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent_data() -> AgentData {
        AgentData {
            accelerometer: AccelerometerData { x: 0.5, y: -1.0, z: 9.8 },
            gps: GpsData { latitude: 50.45, longitude: 30.52 },
            timestamp: "2024-03-15T14:34:20.236457Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_road_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RoadState::Good).unwrap(), "\"good\"");
        assert_eq!(serde_json::to_string(&RoadState::Bad).unwrap(), "\"bad\"");
    }

    #[test]
    fn test_processed_agent_data_roundtrip() {
        let entry = ProcessedAgentData::new(RoadState::Bad, sample_agent_data());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"road_state\":\"bad\""));
        let parsed: ProcessedAgentData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_rejects_unknown_road_state() {
        let json = r#"{
            "road_state": "muddy",
            "agent_data": {
                "accelerometer": {"x": 0.0, "y": 0.0, "z": 0.0},
                "gps": {"latitude": 0.0, "longitude": 0.0},
                "timestamp": "2024-03-15T14:34:20Z"
            }
        }"#;
        assert!(serde_json::from_str::<ProcessedAgentData>(json).is_err());
    }
}
