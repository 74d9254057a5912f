//! Reactive speed and lane policy
//!
//! Each tick the policy looks for vehicles ahead in the ego lane, softly
//! brakes behind slower ones and otherwise ramps the target speed up to the
//! cruise ceiling. An optional lane change, gated by `check_lane`, can be
//! enabled instead of braking.

use std::fmt;

use log::debug;
use serde::Deserialize;

use crate::common::{BehaviorPolicy, LaneGeometry, TrafficSnapshot, TrafficVehicle};

/// Policy configuration; speeds are in mph, distances in m
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Target speed the policy ramps towards when unobstructed
    pub cruise_ceiling: f64,
    /// Speed added per tick while accelerating
    pub speed_increment: f64,
    /// Gap below which a lead vehicle counts as too close
    pub follow_distance: f64,
    /// Lead must be this much slower than the target speed to trigger braking
    pub speed_margin: f64,
    /// Scale of the per-tick speed reduction
    pub brake_gain: f64,
    /// Gap below which a vehicle blocks a lane change
    pub lane_check_distance: f64,
    /// Trajectory time step used to project traffic forward [s]
    pub dt: f64,
    /// Factor converting m/s into mph
    pub mps_to_mph: f64,
    pub lane_change_enabled: bool,
    /// Project traffic forward in the lane-change check as in the braking check
    pub project_lane_check: bool,
    /// Lateral distance to the target lane center above which a lane change is still running
    pub lane_change_tolerance: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cruise_ceiling: 49.75,
            speed_increment: 0.224,
            follow_distance: 30.0,
            speed_margin: 0.112,
            brake_gain: 0.1,
            lane_check_distance: 25.0,
            dt: 0.02,
            mps_to_mph: 2.23694,
            lane_change_enabled: false,
            project_lane_check: true,
            lane_change_tolerance: 1.0,
        }
    }
}

/// Target lane and speed carried from one tick to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerState {
    pub lane: usize,
    /// Target speed [mph]
    pub target_speed: f64,
}

impl PlannerState {
    pub fn new(lane: usize, target_speed: f64) -> Self {
        Self { lane, target_speed }
    }
}

impl Default for PlannerState {
    /// Middle lane, standing start
    fn default() -> Self {
        Self { lane: 1, target_speed: 0.0 }
    }
}

/// Ego quantities the policy reasons about
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyContext {
    /// Ego longitudinal position, advanced to the end of the pending suffix
    pub ego_s: f64,
    /// Ego lateral offset
    pub ego_d: f64,
    /// Points of the previous trajectory not yet executed
    pub pending_points: usize,
    pub track_length: f64,
}

/// Outcome of one policy evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyAction {
    Accelerate { increment: f64 },
    Hold,
    Decelerate { gap: f64, decrement: f64 },
    ChangeLane { from: usize, to: usize },
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyAction::Accelerate { increment } => write!(f, "ACCELERATE(+{:.3})", increment),
            PolicyAction::Hold => write!(f, "HOLD"),
            PolicyAction::Decelerate { gap, decrement } => {
                write!(f, "DECELERATE(-{:.3} @ {:.1} m)", decrement, gap)
            }
            PolicyAction::ChangeLane { from, to } => write!(f, "CHANGING_LANE({} -> {})", from, to),
        }
    }
}

/// A slower vehicle ahead in the ego lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Braking {
    pub id: i64,
    pub gap: f64,
    /// Lead speed [mph]
    pub lead_speed: f64,
    /// Unitless deceleration factor in [0, 1]
    pub deceleration: f64,
}

/// Result of scanning the ego lane
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookAhead {
    pub too_close: bool,
    /// Lead vehicle asking for the strongest braking
    pub braking: Option<Braking>,
}

pub struct SpeedAndLanePolicy {
    config: PolicyConfig,
    lanes: LaneGeometry,
}

impl SpeedAndLanePolicy {
    pub fn new(config: PolicyConfig, lanes: LaneGeometry) -> Self {
        Self { config, lanes }
    }

    pub fn with_defaults() -> Self {
        Self::new(PolicyConfig::default(), LaneGeometry::default())
    }

    /// Quadratic braking profile, 1 at zero gap and 0 at the follow distance.
    ///
    /// With a 30 m follow distance this is `gap * (gap / 900 - 1 / 15) + 1`.
    pub fn deceleration(&self, gap: f64) -> f64 {
        (1.0 - gap / self.config.follow_distance).powi(2)
    }

    /// Scan the vehicles in `lane` ahead of the ego vehicle
    pub fn look_ahead(
        &self,
        traffic: &TrafficSnapshot,
        lane: usize,
        context: &PolicyContext,
        target_speed: f64,
    ) -> LookAhead {
        let mut result = LookAhead::default();

        for vehicle in traffic.iter().filter(|v| self.lanes.contains(lane, v.d)) {
            let gap = self.gap(vehicle, context, true);
            if gap <= 0.0 || gap >= self.config.follow_distance {
                continue;
            }
            result.too_close = true;

            let lead_speed = vehicle.speed() * self.config.mps_to_mph;
            if lead_speed < target_speed - self.config.speed_margin {
                let deceleration = self.deceleration(gap);
                let stronger = result.braking.map_or(true, |b| deceleration > b.deceleration);
                if stronger {
                    result.braking = Some(Braking { id: vehicle.id, gap, lead_speed, deceleration });
                }
            }
        }
        result
    }

    /// Whether a vehicle in `lane` is ahead of the ego vehicle within the lane-check distance
    pub fn check_lane(&self, traffic: &TrafficSnapshot, lane: usize, context: &PolicyContext) -> bool {
        traffic.iter()
            .filter(|v| self.lanes.contains(lane, v.d))
            .any(|v| {
                let gap = self.gap(v, context, self.config.project_lane_check);
                gap > 0.0 && gap < self.config.lane_check_distance
            })
    }

    /// Pick the action for this tick
    pub fn decide(&self, state: &PlannerState, traffic: &TrafficSnapshot, context: &PolicyContext) -> PolicyAction {
        let look_ahead = self.look_ahead(traffic, state.lane, context, state.target_speed);

        if look_ahead.too_close {
            if self.config.lane_change_enabled && !self.lane_change_in_progress(state, context) {
                if let Some(to) = self.free_adjacent_lane(traffic, state.lane, context) {
                    return PolicyAction::ChangeLane { from: state.lane, to };
                }
            }
            return match look_ahead.braking {
                Some(braking) => PolicyAction::Decelerate {
                    gap: braking.gap,
                    decrement: self.config.brake_gain * braking.deceleration,
                },
                None => PolicyAction::Hold,
            };
        }

        if state.target_speed < self.config.cruise_ceiling {
            PolicyAction::Accelerate { increment: self.config.speed_increment }
        } else {
            PolicyAction::Hold
        }
    }

    /// State after executing `action`
    pub fn apply(&self, state: &PlannerState, action: &PolicyAction) -> PlannerState {
        match *action {
            PolicyAction::Accelerate { increment } => {
                PlannerState::new(state.lane, state.target_speed + increment)
            }
            PolicyAction::Hold => *state,
            PolicyAction::Decelerate { decrement, .. } => {
                PlannerState::new(state.lane, (state.target_speed - decrement).max(0.0))
            }
            PolicyAction::ChangeLane { to, .. } => PlannerState::new(to, state.target_speed),
        }
    }

    fn lane_change_in_progress(&self, state: &PlannerState, context: &PolicyContext) -> bool {
        (context.ego_d - self.lanes.center(state.lane)).abs() > self.config.lane_change_tolerance
    }

    /// Left neighbour first, then right
    fn free_adjacent_lane(&self, traffic: &TrafficSnapshot, lane: usize, context: &PolicyContext) -> Option<usize> {
        let left = lane.checked_sub(1);
        let right = Some(lane + 1).filter(|&l| self.lanes.is_valid(l));
        left.into_iter()
            .chain(right)
            .find(|&candidate| !self.check_lane(traffic, candidate, context))
    }

    /// Longitudinal gap to `vehicle`, wrapped into half a lap either way
    fn gap(&self, vehicle: &TrafficVehicle, context: &PolicyContext, project: bool) -> f64 {
        let mut other_s = vehicle.s;
        if project {
            other_s += context.pending_points as f64 * self.config.dt * vehicle.speed();
        }
        let gap = other_s - context.ego_s;

        let length = context.track_length;
        if !length.is_finite() || length <= 0.0 {
            return gap;
        }
        let wrapped = gap.rem_euclid(length);
        if wrapped > length / 2.0 {
            wrapped - length
        } else {
            wrapped
        }
    }
}

impl BehaviorPolicy for SpeedAndLanePolicy {
    fn update(
        &self,
        state: &PlannerState,
        traffic: &TrafficSnapshot,
        context: &PolicyContext,
    ) -> (PlannerState, PolicyAction) {
        let action = self.decide(state, traffic, context);
        let next = self.apply(state, &action);
        if action != PolicyAction::Hold {
            debug!(
                "{}: lane {} -> {}, speed {:.3} -> {:.3} mph",
                action, state.lane, next.lane, state.target_speed, next.target_speed
            );
        }
        (next, action)
    }
}
