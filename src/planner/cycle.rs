//! One planning tick: policy update followed by trajectory generation
//!
//! The target lane and speed live in an explicit [`PlannerState`] that the
//! caller passes in and receives back, so consecutive ticks stay connected
//! without any global state.

use log::{debug, warn};

use crate::behavior_planning::{PlannerState, PolicyAction, PolicyContext, SpeedAndLanePolicy};
use crate::common::{BehaviorPolicy, CoordinateTransform, PlanningResult, Trajectory};
use crate::mapping::GeometryMap;
use crate::path_planning::{TrajectoryGenerator, TrajectoryRequest};
use crate::planner::config::PlannerConfig;
use crate::planner::telemetry::Telemetry;

/// Everything a successful tick produces
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub trajectory: Trajectory,
    pub state: PlannerState,
    pub action: PolicyAction,
}

pub struct PlanningCycle<M: CoordinateTransform = GeometryMap, P: BehaviorPolicy = SpeedAndLanePolicy> {
    map: M,
    generator: TrajectoryGenerator,
    policy: P,
}

impl<M: CoordinateTransform> PlanningCycle<M, SpeedAndLanePolicy> {
    pub fn new(map: M, config: &PlannerConfig) -> Self {
        let generator = TrajectoryGenerator::new(config.generator.clone(), config.lanes);
        let policy = SpeedAndLanePolicy::new(config.policy, config.lanes);
        Self::with_parts(map, generator, policy)
    }
}

impl<M: CoordinateTransform, P: BehaviorPolicy> PlanningCycle<M, P> {
    pub fn with_parts(map: M, generator: TrajectoryGenerator, policy: P) -> Self {
        Self { map, generator, policy }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Run one tick; shape violations in the input abort the tick untouched
    pub fn tick(&self, state: &PlannerState, telemetry: &Telemetry) -> PlanningResult<TickOutput> {
        let previous = telemetry.previous_path()?;
        let traffic = telemetry.traffic()?;
        let pose = telemetry.pose();

        // decide for the moment the new points start executing
        let pending = previous.len();
        let ego_s = if pending > 0 { telemetry.end_path_s } else { telemetry.s };

        let context = PolicyContext {
            ego_s,
            ego_d: telemetry.d,
            pending_points: pending,
            track_length: self.map.track_length(),
        };
        let (next, action) = self.policy.update(state, &traffic, &context);

        let request = TrajectoryRequest {
            pose: &pose,
            previous: &previous,
            start_s: ego_s,
            lane: next.lane,
            target_speed: next.target_speed,
        };
        let trajectory = self.generator.generate(&self.map, &request);

        debug!(
            "Tick: {} pending, {} vehicles, {} -> lane {} at {:.3} mph",
            pending,
            traffic.len(),
            action,
            next.lane,
            next.target_speed
        );
        Ok(TickOutput { trajectory, state: next, action })
    }

    /// Run one tick, keeping the previous state when the input is rejected
    pub fn step(&self, state: PlannerState, telemetry: &Telemetry) -> (PlannerState, Option<Trajectory>) {
        match self.tick(&state, telemetry) {
            Ok(output) => (output.state, Some(output.trajectory)),
            Err(e) => {
                warn!("Skipping tick: {}", e);
                (state, None)
            }
        }
    }
}
