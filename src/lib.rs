//! highway_planner - Rust implementation of a highway motion planner
//!
//! This crate provides Frenet/Cartesian transforms over a closed-loop
//! reference path, a spline-based trajectory generator, a reactive speed
//! and lane policy, and the planning cycle tying them to simulator telemetry.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod mapping;
pub mod path_planning;
pub mod behavior_planning;
pub mod planner;

// Re-export common types for convenience
pub use common::{Point2D, VehiclePose, FrenetCoordinate, Trajectory, TrafficVehicle, TrafficSnapshot, LaneGeometry};
pub use common::{CoordinateTransform, BehaviorPolicy};
pub use common::{PlanningError, PlanningResult};
pub use mapping::GeometryMap;
pub use path_planning::TrajectoryGenerator;
pub use behavior_planning::{PlannerState, SpeedAndLanePolicy};
pub use planner::{PlannerConfig, PlanningCycle};
