//! Planner configuration loaded from YAML
//!
//! Every section is optional; missing values fall back to the defaults of
//! the highway track.
//!
//! ```yaml
//! map:
//!   track_length: 6945.554
//! policy:
//!   lane_change_enabled: true
//! ```

use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde::Deserialize;

use crate::behavior_planning::{PlannerState, PolicyConfig};
use crate::common::{LaneGeometry, PlanningError, PlanningResult};
use crate::mapping::GeometryMapConfig;
use crate::path_planning::TrajectoryGeneratorConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub map: GeometryMapConfig,
    pub lanes: LaneGeometry,
    pub generator: TrajectoryGeneratorConfig,
    pub policy: PolicyConfig,
}

impl PlannerConfig {
    pub fn from_yaml_str(yaml: &str) -> PlanningResult<Self> {
        let config: PlannerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> PlanningResult<Self> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> PlanningResult<()> {
        let invalid = |msg: &str| Err(PlanningError::InvalidParameter(msg.to_string()));

        if !(self.map.track_length > 0.0) {
            return invalid("map.track_length must be positive");
        }
        if !(self.lanes.width > 0.0) {
            return invalid("lanes.width must be positive");
        }
        if !self.lanes.is_valid(PlannerState::default().lane) {
            return invalid("lanes.count must include the starting lane");
        }
        if self.generator.horizon == 0 || !(self.generator.dt > 0.0) {
            return invalid("generator.horizon and generator.dt must be positive");
        }
        if !(self.generator.lookahead_x > 0.0) || !(self.generator.mph_per_mps > 0.0) {
            return invalid("generator.lookahead_x and generator.mph_per_mps must be positive");
        }
        let offsets = &self.generator.anchor_offsets;
        if offsets.is_empty()
            || offsets[0] <= 0.0
            || !offsets.iter().tuple_windows().all(|(a, b)| b > a)
        {
            return invalid("generator.anchor_offsets must be positive and increasing");
        }
        if !(self.policy.follow_distance > 0.0) {
            return invalid("policy.follow_distance must be positive");
        }
        // traffic is projected over the pending points at the trajectory time step
        if (self.policy.dt - self.generator.dt).abs() > 1e-12 {
            return invalid("policy.dt must equal generator.dt");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generator.horizon, 50);
        assert_eq!(config.policy.cruise_ceiling, 49.75);
        assert!(!config.policy.lane_change_enabled);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "map:\n  track_length: 1000.0\npolicy:\n  lane_change_enabled: true\n";
        let config = PlannerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.map.track_length, 1000.0);
        assert_eq!(config.map.interior_x, 1000.0);
        assert!(config.policy.lane_change_enabled);
        assert_eq!(config.policy.speed_increment, 0.224);
        assert_eq!(config.lanes, LaneGeometry::default());
    }

    #[test]
    fn test_time_steps_must_agree() {
        let yaml = "generator:\n  dt: 0.05\n";
        assert!(matches!(PlannerConfig::from_yaml_str(yaml), Err(PlanningError::InvalidParameter(_))));

        let yaml = "generator:\n  dt: 0.05\npolicy:\n  dt: 0.05\n";
        let config = PlannerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.policy.dt, config.generator.dt);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let yaml = "generator:\n  anchor_offsets: [30.0, 20.0]\n";
        assert!(matches!(PlannerConfig::from_yaml_str(yaml), Err(PlanningError::InvalidParameter(_))));

        let yaml = "lanes:\n  count: 0\n";
        assert!(PlannerConfig::from_yaml_str(yaml).is_err());

        let yaml = "lanes:\n  count: 1\n";
        assert!(matches!(PlannerConfig::from_yaml_str(yaml), Err(PlanningError::InvalidParameter(_))));

        let yaml = "generator: [1, 2]\n";
        assert!(matches!(PlannerConfig::from_yaml_str(yaml), Err(PlanningError::InvalidParameter(_))));
    }
}
