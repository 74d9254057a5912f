//! Simulator message framing and telemetry (de)serialization
//!
//! Frames exchanged with the simulator start with `42` followed by a JSON
//! array `[event, data]`. A `telemetry` event carries the ego state, the
//! unconsumed part of the last trajectory and the sensor fusion records;
//! the reply is a `control` event with the next trajectory.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{PlanningError, PlanningResult, TrafficSnapshot, Trajectory, VehiclePose};

/// Reply sent when the simulator is in manual mode
pub const MANUAL_FRAME: &str = "42[\"manual\",{}]";

const EVENT_PREFIX: &str = "42";

/// Ego state, pending trajectory and traffic for one tick
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Telemetry {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub d: f64,
    /// Heading [deg]
    pub yaw: f64,
    /// Speed [mph]
    pub speed: f64,
    #[serde(default)]
    pub previous_path_x: Vec<f64>,
    #[serde(default)]
    pub previous_path_y: Vec<f64>,
    #[serde(default)]
    pub end_path_s: f64,
    #[serde(default)]
    pub end_path_d: f64,
    /// `[id, x, y, vx, vy, s, d]` per observed vehicle
    #[serde(default)]
    pub sensor_fusion: Vec<Vec<f64>>,
}

impl Telemetry {
    pub fn pose(&self) -> VehiclePose {
        VehiclePose::from_degrees(self.x, self.y, self.yaw, self.speed)
    }

    pub fn previous_path(&self) -> PlanningResult<Trajectory> {
        Trajectory::from_xy(&self.previous_path_x, &self.previous_path_y)
    }

    pub fn traffic(&self) -> PlanningResult<TrafficSnapshot> {
        TrafficSnapshot::from_records(&self.sensor_fusion)
    }
}

/// Trajectory in the wire layout expected by the simulator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlMessage {
    pub next_x: Vec<f64>,
    pub next_y: Vec<f64>,
}

impl From<&Trajectory> for ControlMessage {
    fn from(trajectory: &Trajectory) -> Self {
        Self {
            next_x: trajectory.x_coords(),
            next_y: trajectory.y_coords(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorEvent {
    Telemetry(Box<Telemetry>),
    /// No data attached: the simulator is driven manually
    Manual,
}

/// Decode one frame; `Ok(None)` for frames that carry no event of interest
pub fn parse_frame(frame: &str) -> PlanningResult<Option<SimulatorEvent>> {
    let payload = match frame.trim().strip_prefix(EVENT_PREFIX) {
        Some(payload) if !payload.is_empty() => payload,
        _ => return Ok(None),
    };

    let value: Value = serde_json::from_str(payload)?;
    let items = value.as_array()
        .ok_or_else(|| PlanningError::MalformedTelemetry("event payload is not an array".to_string()))?;
    let event = items.get(0)
        .and_then(Value::as_str)
        .ok_or_else(|| PlanningError::MalformedTelemetry("missing event name".to_string()))?;

    let data = match items.get(1) {
        None | Some(Value::Null) => return Ok(Some(SimulatorEvent::Manual)),
        Some(data) => data,
    };
    if event != "telemetry" {
        return Ok(None);
    }

    let telemetry: Telemetry = serde_json::from_value(data.clone())?;
    Ok(Some(SimulatorEvent::Telemetry(Box::new(telemetry))))
}

/// Encode a trajectory as a `control` frame
pub fn control_frame(trajectory: &Trajectory) -> PlanningResult<String> {
    let message = serde_json::to_string(&ControlMessage::from(trajectory))?;
    Ok(format!("{}[\"control\",{}]", EVENT_PREFIX, message))
}
