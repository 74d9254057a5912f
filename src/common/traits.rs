//! Common traits defining the seams between planning components

use crate::behavior_planning::{PlannerState, PolicyAction, PolicyContext};
use crate::common::types::*;

/// Bidirectional mapping between road-relative and Cartesian coordinates
pub trait CoordinateTransform {
    /// Cartesian position and heading [rad] to (s, d)
    fn to_frenet(&self, position: Point2D, heading: f64) -> FrenetCoordinate;

    /// (s, d) to Cartesian position; `s` is expected in `[0, track_length)`
    fn to_cartesian(&self, s: f64, d: f64) -> Point2D;

    /// Arc length at which the longitudinal coordinate wraps back to zero
    fn track_length(&self) -> f64;
}

/// Trait for reactive behavior policies updating target lane and speed
pub trait BehaviorPolicy {
    /// Inspect traffic and return the next state plus the action taken
    fn update(
        &self,
        state: &PlannerState,
        traffic: &TrafficSnapshot,
        context: &PolicyContext,
    ) -> (PlannerState, PolicyAction);
}
