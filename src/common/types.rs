//! Common types used throughout highway_planner

use nalgebra::Vector2;
use serde::Deserialize;

use crate::common::error::{PlanningError, PlanningResult};

/// Number of fields in one sensor fusion record: `[id, x, y, vx, vy, s, d]`
pub const TRAFFIC_RECORD_LEN: usize = 7;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Heading of the vector pointing from `self` to `other`
    pub fn heading_to(&self, other: &Point2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// Ego vehicle state at a sampling instant
///
/// `yaw` is in radians, `speed` in miles per hour (the simulator's unit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub speed: f64,
}

impl VehiclePose {
    pub fn new(x: f64, y: f64, yaw: f64, speed: f64) -> Self {
        Self { x, y, yaw, speed }
    }

    /// Build a pose from a heading given in degrees
    pub fn from_degrees(x: f64, y: f64, yaw_deg: f64, speed: f64) -> Self {
        Self::new(x, y, yaw_deg.to_radians(), speed)
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Road-relative coordinate: arc length `s` and signed lateral offset `d`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrenetCoordinate {
    pub s: f64,
    pub d: f64,
}

impl FrenetCoordinate {
    pub fn new(s: f64, d: f64) -> Self {
        Self { s, d }
    }
}

/// Sequence of Cartesian points spaced by a fixed time step
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub points: Vec<Point2D>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { points: Vec::with_capacity(capacity) }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    /// Build from the two parallel coordinate sequences used on the wire
    pub fn from_xy(x: &[f64], y: &[f64]) -> PlanningResult<Self> {
        if x.len() != y.len() {
            return Err(PlanningError::MalformedTelemetry(format!(
                "trajectory x/y length mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        let points = x.iter().zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Ok(Self { points })
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Point2D> {
        self.points.last().copied()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::new()
    }
}

/// One vehicle reported by sensor fusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficVehicle {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub s: f64,
    pub d: f64,
}

impl TrafficVehicle {
    /// Parse a `[id, x, y, vx, vy, s, d]` record
    pub fn from_record(record: &[f64]) -> PlanningResult<Self> {
        if record.len() != TRAFFIC_RECORD_LEN {
            return Err(PlanningError::MalformedTelemetry(format!(
                "traffic record has {} fields, expected {}",
                record.len(),
                TRAFFIC_RECORD_LEN
            )));
        }
        Ok(Self {
            id: record[0] as i64,
            x: record[1],
            y: record[2],
            vx: record[3],
            vy: record[4],
            s: record[5],
            d: record[6],
        })
    }

    /// Speed magnitude [m/s]
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Vehicles observed at one sampling instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficSnapshot {
    pub vehicles: Vec<TrafficVehicle>,
}

impl TrafficSnapshot {
    pub fn new() -> Self {
        Self { vehicles: Vec::new() }
    }

    pub fn from_vehicles(vehicles: Vec<TrafficVehicle>) -> Self {
        Self { vehicles }
    }

    pub fn from_records(records: &[Vec<f64>]) -> PlanningResult<Self> {
        let vehicles = records.iter()
            .map(|r| TrafficVehicle::from_record(r))
            .collect::<PlanningResult<Vec<_>>>()?;
        Ok(Self { vehicles })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficVehicle> {
        self.vehicles.iter()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// Fixed lane layout: lanes of equal width counted from the reference path outward
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LaneGeometry {
    pub width: f64,
    pub count: usize,
}

impl LaneGeometry {
    /// Lateral offset of the lane center
    pub fn center(&self, lane: usize) -> f64 {
        self.width * lane as f64 + self.width / 2.0
    }

    /// Whether `d` lies strictly inside the lane
    pub fn contains(&self, lane: usize, d: f64) -> bool {
        let center = self.center(lane);
        d > center - self.width / 2.0 && d < center + self.width / 2.0
    }

    pub fn is_valid(&self, lane: usize) -> bool {
        lane < self.count
    }
}

impl Default for LaneGeometry {
    fn default() -> Self {
        Self { width: 4.0, count: 3 }
    }
}
