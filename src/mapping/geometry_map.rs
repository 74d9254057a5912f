//! Frenet <-> Cartesian transforms over a closed, piecewise-linear reference path
//!
//! The sign of the lateral offset is decided against an interior reference
//! point placed well inside the loop: a position closer to that point than
//! its foot on the path lies on the negative side.

use std::f64::consts::PI;

use ordered_float::OrderedFloat;
use serde::Deserialize;

use crate::common::{CoordinateTransform, FrenetCoordinate, PlanningResult, Point2D};
use crate::mapping::reference_path::ReferencePath;

/// Heading deviation above which the closest waypoint counts as already passed
const BEHIND_ANGLE: f64 = PI / 4.0;

/// Geometry map configuration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometryMapConfig {
    /// Arc length at which `s` wraps to zero
    pub track_length: f64,
    /// Point well inside the closed loop used for the lateral sign
    pub interior_x: f64,
    pub interior_y: f64,
}

impl Default for GeometryMapConfig {
    fn default() -> Self {
        Self {
            track_length: 6945.554,
            interior_x: 1000.0,
            interior_y: 2000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeometryMap {
    reference: ReferencePath,
    interior: Point2D,
}

impl GeometryMap {
    pub fn new(reference: ReferencePath, interior: Point2D) -> Self {
        Self { reference, interior }
    }

    /// Load the map table and build the transform layer in one step
    pub fn load<P: AsRef<std::path::Path>>(path: P, config: &GeometryMapConfig) -> PlanningResult<Self> {
        let reference = ReferencePath::load(path, config.track_length)?;
        Ok(Self::new(reference, Point2D::new(config.interior_x, config.interior_y)))
    }

    pub fn reference(&self) -> &ReferencePath {
        &self.reference
    }

    /// Index of the waypoint nearest to `position`; ties go to the first one
    pub fn closest_waypoint(&self, position: Point2D) -> usize {
        self.reference.waypoints().iter()
            .enumerate()
            .min_by_key(|(_, wp)| OrderedFloat(wp.position.distance(&position)))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Closest waypoint that still lies ahead of a vehicle heading along `heading`
    pub fn next_waypoint(&self, position: Point2D, heading: f64) -> usize {
        let closest = self.closest_waypoint(position);
        let to_waypoint = position.heading_to(&self.reference.waypoints()[closest].position);

        if normalize_angle(heading - to_waypoint).abs() > BEHIND_ANGLE {
            self.reference.next_index(closest)
        } else {
            closest
        }
    }

    /// Cartesian position and heading [rad] to Frenet coordinates
    pub fn to_frenet(&self, position: Point2D, heading: f64) -> FrenetCoordinate {
        let waypoints = self.reference.waypoints();
        let next = self.next_waypoint(position, heading);
        let prev = self.reference.prev_index(next);

        let prev_pos = waypoints[prev].position;
        let segment = waypoints[next].position.to_vector() - prev_pos.to_vector();
        let offset = position.to_vector() - prev_pos.to_vector();

        let seg_norm_sq = segment.norm_squared();
        let projection = if seg_norm_sq > 0.0 {
            segment * (offset.dot(&segment) / seg_norm_sq)
        } else {
            segment * 0.0
        };

        let mut d = (offset - projection).norm();
        let foot = Point2D::from(prev_pos.to_vector() + projection);
        if self.interior.distance(&position) <= self.interior.distance(&foot) {
            d = -d;
        }

        let s = (waypoints[prev].s + projection.norm()).rem_euclid(self.reference.track_length());
        FrenetCoordinate::new(s, d)
    }

    /// Frenet coordinates to a Cartesian position; `s` must already be wrapped
    pub fn to_cartesian(&self, s: f64, d: f64) -> Point2D {
        let waypoints = self.reference.waypoints();
        let prev = waypoints.iter()
            .take_while(|wp| wp.s <= s)
            .count()
            .saturating_sub(1);
        let next = self.reference.next_index(prev);

        let prev_pos = waypoints[prev].position;
        let heading = prev_pos.heading_to(&waypoints[next].position);
        let seg_s = s - waypoints[prev].s;

        let seg_x = prev_pos.x + seg_s * heading.cos();
        let seg_y = prev_pos.y + seg_s * heading.sin();
        let perp_heading = heading - PI / 2.0;

        Point2D::new(seg_x + d * perp_heading.cos(), seg_y + d * perp_heading.sin())
    }
}

impl CoordinateTransform for GeometryMap {
    fn to_frenet(&self, position: Point2D, heading: f64) -> FrenetCoordinate {
        GeometryMap::to_frenet(self, position, heading)
    }

    fn to_cartesian(&self, s: f64, d: f64) -> Point2D {
        GeometryMap::to_cartesian(self, s, d)
    }

    fn track_length(&self) -> f64 {
        self.reference.track_length()
    }
}

/// Normalize angle to [-pi, pi]
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::reference_path::Waypoint;
    use approx::assert_relative_eq;

    const N: usize = 8;

    /// Unit circle sampled at 8 points, counter-clockwise, arc length by chord
    fn unit_circle() -> GeometryMap {
        let points: Vec<Point2D> = (0..N)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / N as f64;
                Point2D::new(a.cos(), a.sin())
            })
            .collect();
        GeometryMap::new(ReferencePath::from_polyline(&points).unwrap(), Point2D::origin())
    }

    fn chord() -> f64 {
        2.0 * (PI / N as f64).sin()
    }

    #[test]
    fn test_on_path_at_origin() {
        let map = unit_circle();
        let frenet = map.to_frenet(Point2D::new(1.0, 0.0), PI / 2.0);
        assert_relative_eq!(frenet.s, 0.0, epsilon = 1e-9);
        assert_relative_eq!(frenet.d, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_outward_shift_is_positive() {
        let map = unit_circle();
        let frenet = map.to_frenet(Point2D::new(2.0, 0.0), PI / 2.0);
        assert!(frenet.d > 0.0);
        assert_relative_eq!(frenet.d, 1.0, epsilon = 0.1);

        let frenet = map.to_frenet(Point2D::new(0.5, 0.0), PI / 2.0);
        assert!(frenet.d < 0.0);
    }

    #[test]
    fn test_sign_consistent_around_loop() {
        let map = unit_circle();
        let waypoints = map.reference().waypoints().to_vec();
        for i in 0..N {
            // a quarter of the way along each chord, shifted along the chord normal
            let a = 2.0 * PI * (i as f64 + 0.5) / N as f64;
            let start = waypoints[i].position;
            let end = waypoints[(i + 1) % N].position;
            let foot = Point2D::new(start.x + 0.25 * (end.x - start.x), start.y + 0.25 * (end.y - start.y));
            let heading = a + PI / 2.0;

            let outside = map.to_frenet(Point2D::new(foot.x + a.cos(), foot.y + a.sin()), heading);
            assert_relative_eq!(outside.d, 1.0, epsilon = 1e-9);
            assert_relative_eq!(outside.s, chord() * (i as f64 + 0.25), epsilon = 1e-9);

            let inside = map.to_frenet(Point2D::new(foot.x - 0.5 * a.cos(), foot.y - 0.5 * a.sin()), heading);
            assert_relative_eq!(inside.d, -0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_round_trip() {
        const M: usize = 64;
        let radius = 100.0;
        let points: Vec<Point2D> = (0..M)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / M as f64;
                Point2D::new(radius * a.cos(), radius * a.sin())
            })
            .collect();
        let map = GeometryMap::new(ReferencePath::from_polyline(&points).unwrap(), Point2D::origin());
        let chord = 2.0 * radius * (PI / M as f64).sin();

        for i in 0..M {
            for &frac in &[0.1, 0.3, 0.5, 0.7] {
                for &d in &[-2.0, 0.0, 2.0] {
                    let s = chord * (i as f64 + frac);
                    let p = map.to_cartesian(s, d);
                    let heading = 2.0 * PI * (i as f64 + 0.5) / M as f64 + PI / 2.0;
                    let frenet = map.to_frenet(p, heading);
                    let back = map.to_cartesian(frenet.s, frenet.d);
                    assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
                    assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
                    assert_relative_eq!(frenet.s, s, epsilon = 1e-6);
                    assert_relative_eq!(frenet.d, d, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_to_cartesian_wrap_segment() {
        let map = unit_circle();
        // halfway along the closing segment from the last waypoint back to the first
        let s = chord() * 7.5;
        let p = map.to_cartesian(s, 0.0);
        let last = map.reference().waypoints()[N - 1].position;
        assert_relative_eq!(p.x, (last.x + 1.0) / 2.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, last.y / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_frenet_wraps_past_start() {
        let map = unit_circle();
        // just before the start line on the closing segment
        let p = map.to_cartesian(map.track_length() - 0.01, 0.0);
        let frenet = map.to_frenet(p, 3.0 * PI / 8.0);
        assert!(frenet.s >= 0.0 && frenet.s < map.track_length());
        assert_relative_eq!(frenet.s, map.track_length() - 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_closest_waypoint_tie_breaks_first() {
        let waypoints = vec![
            Waypoint::new(-1.0, 0.0, 0.0, 0.0, -1.0),
            Waypoint::new(1.0, 0.0, 2.0, 0.0, -1.0),
            Waypoint::new(0.0, 5.0, 4.0, 0.0, -1.0),
        ];
        let map = GeometryMap::new(ReferencePath::new(waypoints, 10.0).unwrap(), Point2D::origin());
        assert_eq!(map.closest_waypoint(Point2D::origin()), 0);
    }

    #[test]
    fn test_next_waypoint_skips_passed_waypoint() {
        let map = unit_circle();
        // slightly past waypoint 0 while driving counter-clockwise
        let p = map.to_cartesian(0.05, 0.0);
        assert_eq!(map.closest_waypoint(p), 0);
        assert_eq!(map.next_waypoint(p, PI / 2.0 + PI / 8.0), 1);
    }

    #[test]
    fn test_normalize_angle() {
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-PI / 2.0 - 2.0 * PI), -PI / 2.0, epsilon = 1e-12);
    }
}
