//! Road-state classification from parking occupancy

use crate::domain::types::{AgentData, InputData, ProcessedAgentData, RoadState};

/// Highest empty-slot count still classified as a good road state.
/// The boundary is inclusive on the good side.
pub const GOOD_ROAD_MAX_EMPTY_COUNT: f64 = 21.0;

/// Map a parking occupancy count to a road-state label.
///
/// Deterministic, side-effect-free. Two branches by design.
pub fn classify(empty_count: f64) -> RoadState {
    if empty_count <= GOOD_ROAD_MAX_EMPTY_COUNT {
        RoadState::Good
    } else {
        RoadState::Bad
    }
}

/// Classify a raw sampled instant into the record that gets stored and
/// broadcast.
pub fn process_agent_data(input: InputData) -> ProcessedAgentData {
    ProcessedAgentData::new(
        classify(input.parking.empty_count),
        AgentData {
            accelerometer: input.accelerometer,
            gps: input.gps,
            timestamp: input.timestamp,
        },
    )
}
