//! Visualization utilities for highway_planner
//!
//! Plots the road, the planned trajectory and the surrounding traffic
//! using gnuplot.

use std::io;

use gnuplot::{Figure, Caption, Color, PointSymbol, PointSize, LineWidth, AxesCommon, AutoOption};

use crate::common::{CoordinateTransform, LaneGeometry, PlanningError, PlanningResult, Point2D,
                    TrafficSnapshot, Trajectory, VehiclePose};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const CYAN: &str = "#00FFFF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const ROAD_EDGE: &str = BLACK;
    pub const LANE_MARKING: &str = GRAY;
    pub const TRAJECTORY: &str = RED;
    pub const EGO: &str = CYAN;
    pub const TRAFFIC: &str = ORANGE;
    pub const HISTORY: &str = BLUE;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::TRAJECTORY, "Trajectory")
    }
}

pub struct Visualizer {
    figure: Figure,
    title: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_range: None,
            y_range: None,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Fix the view to a square window around `center`
    pub fn set_window(&mut self, center: Point2D, half_size: f64) -> &mut Self {
        self.x_range = Some((center.x - half_size, center.x + half_size));
        self.y_range = Some((center.y - half_size, center.y + half_size));
        self
    }

    pub fn plot_trajectory(&mut self, trajectory: &Trajectory, style: &PathStyle) -> &mut Self {
        self.figure.axes2d()
            .lines(&trajectory.x_coords(), &trajectory.y_coords(), &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ]);
        self
    }

    /// Road edges and lane markings sampled every `step` meters along the track
    pub fn plot_road<M: CoordinateTransform>(&mut self, map: &M, lanes: &LaneGeometry, step: f64) -> &mut Self {
        let samples = (map.track_length() / step).ceil() as usize;
        for boundary in 0..=lanes.count {
            let d = lanes.width * boundary as f64;
            let line: Vec<Point2D> = (0..=samples)
                .map(|i| map.to_cartesian((i as f64 * step).min(map.track_length() - 1e-6), d))
                .collect();
            let x: Vec<f64> = line.iter().map(|p| p.x).collect();
            let y: Vec<f64> = line.iter().map(|p| p.y).collect();

            let edge = boundary == 0 || boundary == lanes.count;
            let (color, width) = if edge { (colors::ROAD_EDGE, 1.5) } else { (colors::LANE_MARKING, 0.5) };
            self.figure.axes2d().lines(&x, &y, &[Color(color), LineWidth(width)]);
        }
        self
    }

    pub fn plot_traffic(&mut self, traffic: &TrafficSnapshot) -> &mut Self {
        let x: Vec<f64> = traffic.iter().map(|v| v.x).collect();
        let y: Vec<f64> = traffic.iter().map(|v| v.y).collect();

        self.figure.axes2d()
            .points(&x, &y, &[
                Caption("Traffic"),
                Color(colors::TRAFFIC),
                PointSymbol('S'),
                PointSize(1.0),
            ]);
        self
    }

    /// Ego position with a heading tick
    pub fn plot_ego(&mut self, pose: &VehiclePose, size: f64) -> &mut Self {
        self.figure.axes2d()
            .points(&[pose.x], &[pose.y], &[
                Caption("Ego"),
                Color(colors::EGO),
                PointSymbol('O'),
                PointSize(size),
            ]);

        let arrow_len = size * 2.0;
        let end_x = pose.x + arrow_len * pose.yaw.cos();
        let end_y = pose.y + arrow_len * pose.yaw.sin();

        self.figure.axes2d()
            .lines(&[pose.x, end_x], &[pose.y, end_y], &[
                Color(colors::EGO),
                LineWidth(2.0),
            ]);
        self
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> PlanningResult<()> {
        self.apply_settings();
        self.figure.save_to_png(path, width, height).map_err(plot_error)
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        axes.set_aspect_ratio(AutoOption::Fix(1.0));
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

fn plot_error<E: std::fmt::Display>(e: E) -> PlanningError {
    PlanningError::IoError(io::Error::new(io::ErrorKind::Other, e.to_string()))
}
