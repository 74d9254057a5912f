//! Spline trajectory generator
//!
//! Extends the unconsumed tail of the previous plan with points sampled
//! from a cubic spline fitted through five anchors: the last two points of
//! the tail (or the pose plus a virtual predecessor on cold start) and three
//! far anchors on the target lane center. The spline is fitted in a local
//! frame anchored at the reference point so that it is a function of local x.

use log::{debug, warn};
use nalgebra::Rotation2;
use serde::Deserialize;

use super::cubic_spline::CubicSpline;
use crate::common::{CoordinateTransform, LaneGeometry, PlanningResult, Point2D, Trajectory, VehiclePose};

/// Tail points closer than this to the reference point give no usable heading [m]
const MIN_SEGMENT: f64 = 1e-6;

/// Trajectory generator configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrajectoryGeneratorConfig {
    /// Number of points in every emitted trajectory
    pub horizon: usize,
    /// Time between consecutive points [s]
    pub dt: f64,
    /// Longitudinal offsets of the far anchors from the planning origin [m]
    pub anchor_offsets: Vec<f64>,
    /// Local x of the chord used to derive the point spacing [m]
    pub lookahead_x: f64,
    /// Divisor converting target speed [mph] into [m/s]
    pub mph_per_mps: f64,
}

impl Default for TrajectoryGeneratorConfig {
    fn default() -> Self {
        Self {
            horizon: 50,
            dt: 0.02,
            anchor_offsets: vec![30.0, 60.0, 90.0],
            lookahead_x: 30.0,
            mph_per_mps: 2.24,
        }
    }
}

/// Rigid frame with its origin at a reference point and x along its heading
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: Point2D,
    rotation: Rotation2<f64>,
}

impl LocalFrame {
    pub fn new(origin: Point2D, yaw: f64) -> Self {
        Self { origin, rotation: Rotation2::new(yaw) }
    }

    pub fn origin(&self) -> Point2D {
        self.origin
    }

    pub fn to_local(&self, p: Point2D) -> Point2D {
        Point2D::from(self.rotation.inverse() * (p.to_vector() - self.origin.to_vector()))
    }

    pub fn to_global(&self, p: Point2D) -> Point2D {
        Point2D::from(self.rotation * p.to_vector() + self.origin.to_vector())
    }
}

/// Inputs of one generation step
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryRequest<'a> {
    pub pose: &'a VehiclePose,
    /// Unconsumed suffix of the previous trajectory
    pub previous: &'a Trajectory,
    /// Longitudinal position the far anchors are measured from
    pub start_s: f64,
    pub lane: usize,
    /// Target speed [mph]
    pub target_speed: f64,
}

pub struct TrajectoryGenerator {
    config: TrajectoryGeneratorConfig,
    lanes: LaneGeometry,
}

impl TrajectoryGenerator {
    pub fn new(config: TrajectoryGeneratorConfig, lanes: LaneGeometry) -> Self {
        Self { config, lanes }
    }

    pub fn with_defaults() -> Self {
        Self::new(TrajectoryGeneratorConfig::default(), LaneGeometry::default())
    }

    /// Produce exactly `horizon` points: the carried suffix followed by new samples
    pub fn generate<M: CoordinateTransform>(&self, map: &M, request: &TrajectoryRequest) -> Trajectory {
        let horizon = self.config.horizon;
        let carried = request.previous.len().min(horizon);
        let remaining = horizon - carried;

        let mut trajectory = Trajectory::with_capacity(horizon);
        trajectory.points.extend_from_slice(&request.previous.points[..carried]);
        if remaining == 0 {
            return trajectory;
        }

        let (predecessor, frame) = self.reference_frame(request);
        let anchors = self.anchors(map, request, predecessor, &frame);

        match self.fit_local_curve(&frame, &anchors) {
            Ok(curve) => {
                trajectory.points.extend(self.sample(&curve, &frame, remaining, request.target_speed));
            }
            Err(e) => {
                let hold = trajectory.last().unwrap_or_else(|| request.pose.position());
                warn!("Anchor fit rejected ({}), holding ({:.3}, {:.3})", e, hold.x, hold.y);
                trajectory.points.extend(std::iter::repeat(hold).take(remaining));
            }
        }

        debug!(
            "Generated trajectory: {} carried, {} new, lane {}, target {:.3} mph",
            carried, remaining, request.lane, request.target_speed
        );
        trajectory
    }

    /// Predecessor point and the local frame anchored at the reference point
    ///
    /// Repeated points at the end of the tail (a held fallback or a standstill)
    /// carry no heading, so the predecessor is the last tail point distinct
    /// from the reference; without one the pose heading is used.
    fn reference_frame(&self, request: &TrajectoryRequest) -> (Point2D, LocalFrame) {
        let pose = request.pose;
        let carried = request.previous.len().min(self.config.horizon);
        let points = &request.previous.points[..carried];

        let behind = |reference: Point2D, yaw: f64| {
            Point2D::new(reference.x - yaw.cos(), reference.y - yaw.sin())
        };

        if points.len() < 2 {
            return (behind(pose.position(), pose.yaw), LocalFrame::new(pose.position(), pose.yaw));
        }

        let reference = points[points.len() - 1];
        let distinct = points.iter()
            .rev()
            .skip(1)
            .find(|p| p.distance(&reference) > MIN_SEGMENT);
        match distinct {
            Some(&predecessor) => (predecessor, LocalFrame::new(reference, predecessor.heading_to(&reference))),
            None => (behind(reference, pose.yaw), LocalFrame::new(reference, pose.yaw)),
        }
    }

    /// The five anchors in global coordinates
    pub fn anchors<M: CoordinateTransform>(
        &self,
        map: &M,
        request: &TrajectoryRequest,
        predecessor: Point2D,
        frame: &LocalFrame,
    ) -> Vec<Point2D> {
        let d = self.lanes.center(request.lane);
        let track_length = map.track_length();

        let mut anchors = Vec::with_capacity(2 + self.config.anchor_offsets.len());
        anchors.push(predecessor);
        anchors.push(frame.origin());
        for offset in &self.config.anchor_offsets {
            let s = (request.start_s + offset).rem_euclid(track_length);
            anchors.push(map.to_cartesian(s, d));
        }
        anchors
    }

    fn fit_local_curve(&self, frame: &LocalFrame, anchors: &[Point2D]) -> PlanningResult<CubicSpline> {
        let local: Vec<Point2D> = anchors.iter().map(|p| frame.to_local(*p)).collect();
        let x: Vec<f64> = local.iter().map(|p| p.x).collect();
        let y: Vec<f64> = local.iter().map(|p| p.y).collect();
        CubicSpline::new(&x, &y)
    }

    /// March along local x with a step giving roughly `target_speed` per time step
    fn sample(&self, curve: &CubicSpline, frame: &LocalFrame, count: usize, target_speed: f64) -> Vec<Point2D> {
        let target_x = self.config.lookahead_x;
        let target_y = curve.calc(target_x);
        let target_distance = target_x.hypot(target_y);

        let speed = target_speed.max(0.0) / self.config.mph_per_mps;
        let x_step = target_x * self.config.dt * speed / target_distance;

        (1..=count)
            .map(|i| {
                let x = x_step * i as f64;
                frame.to_global(Point2D::new(x, curve.calc(x)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FrenetCoordinate;
    use crate::mapping::{GeometryMap, ReferencePath};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Straight road along +x; positive d lies to the right (-y)
    struct StraightRoad;

    impl CoordinateTransform for StraightRoad {
        fn to_frenet(&self, position: Point2D, _heading: f64) -> FrenetCoordinate {
            FrenetCoordinate::new(position.x, -position.y)
        }

        fn to_cartesian(&self, s: f64, d: f64) -> Point2D {
            Point2D::new(s, -d)
        }

        fn track_length(&self) -> f64 {
            10_000.0
        }
    }

    const SPEED: f64 = 49.5;

    fn step() -> f64 {
        SPEED / 2.24 * 0.02
    }

    fn generate(previous: &Trajectory, start_s: f64, lane: usize) -> Trajectory {
        let generator = TrajectoryGenerator::with_defaults();
        let pose = VehiclePose::new(0.0, -6.0, 0.0, 0.0);
        let request = TrajectoryRequest {
            pose: &pose,
            previous,
            start_s,
            lane,
            target_speed: SPEED,
        };
        generator.generate(&StraightRoad, &request)
    }

    #[test]
    fn test_local_frame_round_trip() {
        let frame = LocalFrame::new(Point2D::new(3.0, -2.0), 0.7);
        let p = Point2D::new(10.0, 4.0);
        let back = frame.to_global(frame.to_local(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-12);

        let ahead = frame.to_local(Point2D::new(3.0 + 0.7f64.cos(), -2.0 + 0.7f64.sin()));
        assert_relative_eq!(ahead.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(ahead.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cold_start_spacing() {
        let trajectory = generate(&Trajectory::new(), 0.0, 1);
        assert_eq!(trajectory.len(), 50);
        for (i, p) in trajectory.points.iter().enumerate() {
            assert_relative_eq!(p.x, step() * (i + 1) as f64, epsilon = 1e-9);
            assert_relative_eq!(p.y, -6.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_output_shape_for_any_suffix() {
        let full = generate(&Trajectory::new(), 0.0, 1);
        for &n in &[0usize, 1, 49, 50] {
            let previous = Trajectory::from_points(full.points[..n].to_vec());
            let start_s = previous.last().map(|p| p.x).unwrap_or(0.0);
            assert_eq!(generate(&previous, start_s, 1).len(), 50);
        }
    }

    #[test]
    fn test_suffix_of_45_adds_five_points() {
        let full = generate(&Trajectory::new(), 0.0, 1);
        let previous = Trajectory::from_points(full.points[..45].to_vec());
        let start_s = previous.points[44].x;

        let trajectory = generate(&previous, start_s, 1);
        assert_eq!(trajectory.len(), 50);
        assert_eq!(&trajectory.points[..45], &previous.points[..]);
        for i in 45..50 {
            assert!(trajectory.points[i].x > trajectory.points[i - 1].x);
            assert_relative_eq!(trajectory.points[i].x - trajectory.points[i - 1].x, step(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_continuity_across_ticks() {
        let first = generate(&Trajectory::new(), 0.0, 1);
        let consumed = 3;
        let previous = Trajectory::from_points(first.points[consumed..].to_vec());
        let start_s = previous.points[previous.len() - 1].x;

        let second = generate(&previous, start_s, 1);
        assert_eq!(second.points[0], first.points[consumed]);
        assert_eq!(&second.points[..47], &first.points[consumed..]);
    }

    #[test]
    fn test_lane_change_is_tangent_continuous() {
        let first = generate(&Trajectory::new(), 0.0, 1);
        let previous = Trajectory::from_points(first.points[10..].to_vec());
        let n = previous.len();
        let start_s = previous.points[n - 1].x;

        let trajectory = generate(&previous, start_s, 2);
        let a = trajectory.points[n - 2];
        let b = trajectory.points[n - 1];
        let c = trajectory.points[n];
        let turn = (a.heading_to(&b) - b.heading_to(&c)).abs();
        assert!(turn < 2.0f64.to_radians());
        // moving towards lane 2 (d = 10, y = -10)
        assert!(trajectory.points[49].y < -6.0);
    }

    #[test]
    fn test_degenerate_anchors_hold_last_point() {
        // tail heading backwards while the anchors lie ahead along +x
        let previous = Trajectory::from_points(vec![Point2D::new(10.0, -6.0), Point2D::new(9.0, -6.0)]);
        let trajectory = generate(&previous, 9.0, 1);
        assert_eq!(trajectory.len(), 50);
        for p in &trajectory.points[2..] {
            assert_eq!(*p, Point2D::new(9.0, -6.0));
        }
    }

    #[test]
    fn test_zero_speed_stays_at_reference() {
        let generator = TrajectoryGenerator::with_defaults();
        let pose = VehiclePose::new(0.0, -6.0, 0.0, 0.0);
        let previous = Trajectory::new();
        let request = TrajectoryRequest {
            pose: &pose,
            previous: &previous,
            start_s: 0.0,
            lane: 1,
            target_speed: 0.0,
        };
        let trajectory = generator.generate(&StraightRoad, &request);
        assert_eq!(trajectory.len(), 50);
        assert!(trajectory.points.iter().all(|p| p.distance(&pose.position()) < 1e-9));
    }

    #[test]
    fn test_recovers_after_held_fallback() {
        let previous = Trajectory::from_points(vec![Point2D::new(10.0, -6.0), Point2D::new(9.0, -6.0)]);
        let mut trajectory = generate(&previous, 9.0, 1);
        assert_eq!(trajectory.points[49], Point2D::new(9.0, -6.0));

        // the vehicle executes three points per tick
        for _ in 0..20 {
            let previous = Trajectory::from_points(trajectory.points[3..].to_vec());
            let tail_end = previous.points[previous.len() - 1];
            trajectory = generate(&previous, tail_end.x, 1);

            assert_eq!(trajectory.len(), 50);
            let end = trajectory.points[49];
            assert_relative_eq!(end.x, tail_end.x + 3.0 * step(), epsilon = 1e-9);
            assert_relative_eq!(end.y, -6.0, epsilon = 1e-9);
        }
        assert!(trajectory.points[49].x > 9.0 + 50.0 * step());
    }

    #[test]
    fn test_recovers_after_standstill() {
        let generator = TrajectoryGenerator::with_defaults();
        let pose = VehiclePose::new(0.0, -6.0, 0.0, 0.0);
        let empty = Trajectory::new();
        let stopped = generator.generate(&StraightRoad, &TrajectoryRequest {
            pose: &pose,
            previous: &empty,
            start_s: 0.0,
            lane: 1,
            target_speed: 0.0,
        });

        let previous = Trajectory::from_points(stopped.points[3..].to_vec());
        let restarted = generator.generate(&StraightRoad, &TrajectoryRequest {
            pose: &pose,
            previous: &previous,
            start_s: 0.0,
            lane: 1,
            target_speed: SPEED,
        });
        assert_eq!(&restarted.points[..47], &previous.points[..]);
        for (i, p) in restarted.points[47..].iter().enumerate() {
            assert_relative_eq!(p.x, step() * (i + 1) as f64, epsilon = 1e-9);
            assert_relative_eq!(p.y, -6.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_anchors_wrap_past_track_end() {
        const M: usize = 100;
        let radius = 200.0;
        let points: Vec<Point2D> = (0..M)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / M as f64;
                Point2D::new(radius * a.cos(), radius * a.sin())
            })
            .collect();
        let map = GeometryMap::new(ReferencePath::from_polyline(&points).unwrap(), Point2D::origin());
        let generator = TrajectoryGenerator::with_defaults();

        let start_s = map.track_length() - 10.0;
        let start = map.to_cartesian(start_s, 6.0);
        let ahead = map.to_cartesian(start_s + 1.0, 6.0);
        let pose = VehiclePose::new(start.x, start.y, start.heading_to(&ahead), 0.0);
        let previous = Trajectory::new();
        let request = TrajectoryRequest {
            pose: &pose,
            previous: &previous,
            start_s,
            lane: 1,
            target_speed: SPEED,
        };

        let anchors = generator.anchors(&map, &request, Point2D::origin(), &LocalFrame::new(start, pose.yaw));
        for anchor in &anchors[2..] {
            assert_relative_eq!(anchor.to_vector().norm(), radius + 6.0, epsilon = 0.5);
        }

        let trajectory = generator.generate(&map, &request);
        assert_eq!(trajectory.len(), 50);
        for p in &trajectory.points {
            assert_relative_eq!(p.to_vector().norm(), radius + 6.0, epsilon = 1.0);
        }
    }
}
