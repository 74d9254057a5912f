//! Closed reference path of the highway track
//!
//! The map table stores one sparse waypoint per line as `x y s dx dy`:
//! the Cartesian position, the cumulative arc length from the start line
//! and the unit normal pointing towards positive lateral offsets.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::info;

use crate::common::{PlanningError, PlanningResult, Point2D};

/// One sparse waypoint of the reference path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Point2D,
    pub s: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, s: f64, dx: f64, dy: f64) -> Self {
        Self { position: Point2D::new(x, y), s, dx, dy }
    }
}

/// Ordered, closed sequence of waypoints; the last one connects back to the first
#[derive(Debug, Clone)]
pub struct ReferencePath {
    waypoints: Vec<Waypoint>,
    track_length: f64,
}

impl ReferencePath {
    pub fn new(waypoints: Vec<Waypoint>, track_length: f64) -> PlanningResult<Self> {
        if waypoints.is_empty() {
            return Err(PlanningError::OutOfRangeInput("reference path is empty".to_string()));
        }
        if !track_length.is_finite() || track_length <= 0.0 {
            return Err(PlanningError::OutOfRangeInput(format!(
                "track length must be positive, got {}",
                track_length
            )));
        }
        if let Some((i, _)) = waypoints.iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| b.s <= a.s)
        {
            return Err(PlanningError::OutOfRangeInput(format!(
                "arc length not increasing at waypoint {}",
                i + 1
            )));
        }
        // guarded by the emptiness check above
        let last_s = waypoints[waypoints.len() - 1].s;
        if last_s >= track_length {
            return Err(PlanningError::OutOfRangeInput(format!(
                "waypoint arc length {} exceeds track length {}",
                last_s, track_length
            )));
        }

        Ok(Self { waypoints, track_length })
    }

    /// Build a closed path from bare points, assigning chord-length arc lengths
    /// and right-hand normals.
    pub fn from_polyline(points: &[Point2D]) -> PlanningResult<Self> {
        if points.is_empty() {
            return Err(PlanningError::OutOfRangeInput("reference path is empty".to_string()));
        }
        let n = points.len();

        let mut s = Vec::with_capacity(n);
        s.push(0.0);
        for (a, b) in points.iter().tuple_windows() {
            let last = s[s.len() - 1];
            s.push(last + a.distance(b));
        }
        let track_length = s[n - 1] + points[n - 1].distance(&points[0]);

        let waypoints = (0..n)
            .map(|i| {
                let p = points[i];
                let heading = p.heading_to(&points[(i + 1) % n]);
                Waypoint::new(p.x, p.y, s[i], heading.sin(), -heading.cos())
            })
            .collect();

        Self::new(waypoints, track_length)
    }

    /// Parse the whitespace separated `x y s dx dy` map table
    pub fn from_map_str(data: &str, track_length: f64) -> PlanningResult<Self> {
        let mut waypoints = Vec::new();

        for (line_no, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = line.split_whitespace()
                .map(|f| f.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| PlanningError::OutOfRangeInput(format!("map line {}: {}", line_no + 1, e)))?;

            if fields.len() != 5 {
                return Err(PlanningError::OutOfRangeInput(format!(
                    "map line {}: expected 5 fields, got {}",
                    line_no + 1,
                    fields.len()
                )));
            }
            waypoints.push(Waypoint::new(fields[0], fields[1], fields[2], fields[3], fields[4]));
        }

        Self::new(waypoints, track_length)
    }

    /// Load the map table from disk
    pub fn load<P: AsRef<Path>>(path: P, track_length: f64) -> PlanningResult<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        let reference = Self::from_map_str(&data, track_length)?;
        info!(
            "Loaded {} waypoints from {}",
            reference.len(),
            path.as_ref().display()
        );
        Ok(reference)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn track_length(&self) -> f64 {
        self.track_length
    }

    /// Index of the successor waypoint, wrapping at the end of the loop
    pub fn next_index(&self, i: usize) -> usize {
        (i + 1) % self.waypoints.len()
    }

    /// Index of the predecessor waypoint, wrapping at the start of the loop
    pub fn prev_index(&self, i: usize) -> usize {
        if i == 0 {
            self.waypoints.len() - 1
        } else {
            i - 1
        }
    }
}
