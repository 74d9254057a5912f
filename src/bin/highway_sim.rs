// Highway simulation
// Drives the planning cycle around a stadium-shaped track with random
// traffic and plots the driven path.
//
// author: Ryohei Sasaki (@rsasaki0109)
use std::f64::consts::PI;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use highway_planner::behavior_planning::PolicyConfig;
use highway_planner::mapping::{GeometryMapConfig, ReferencePath};
use highway_planner::planner::Telemetry;
use highway_planner::utils::{colors, PathStyle, Visualizer};
use highway_planner::{CoordinateTransform, GeometryMap, LaneGeometry, PlannerConfig, PlannerState,
                      PlanningCycle, PlanningError, PlanningResult, Point2D, TrafficSnapshot, TrafficVehicle,
                      Trajectory, VehiclePose};

const STRAIGHT: f64 = 400.0;
const RADIUS: f64 = 100.0;
const MPS_TO_MPH: f64 = 2.23694;
// points the vehicle executes between two planner updates
const EXECUTED: usize = 3;
const TICKS: usize = 1500;
const N_TRAFFIC: usize = 12;

struct SimVehicle {
    id: i64,
    lane: usize,
    s: f64,
    speed: f64,
}

impl SimVehicle {
    fn advance(&mut self, track_length: f64, dt: f64) {
        self.s = (self.s + self.speed * dt).rem_euclid(track_length);
    }

    fn observe<M: CoordinateTransform>(&self, map: &M, lanes: &LaneGeometry) -> TrafficVehicle {
        let d = lanes.center(self.lane);
        let p = map.to_cartesian(self.s, d);
        let ahead = map.to_cartesian((self.s + 1.0).rem_euclid(map.track_length()), d);
        let heading = p.heading_to(&ahead);
        TrafficVehicle {
            id: self.id,
            x: p.x,
            y: p.y,
            vx: self.speed * heading.cos(),
            vy: self.speed * heading.sin(),
            s: self.s,
            d,
        }
    }
}

/// Counter-clockwise stadium: two straights joined by half circles
fn stadium() -> Vec<Point2D> {
    let mut points = Vec::new();
    let n_straight = 40;
    let n_arc = 32;

    for i in 0..n_straight {
        points.push(Point2D::new(STRAIGHT * i as f64 / n_straight as f64, 0.0));
    }
    for i in 0..n_arc {
        let a = -PI / 2.0 + PI * i as f64 / n_arc as f64;
        points.push(Point2D::new(STRAIGHT + RADIUS * a.cos(), RADIUS + RADIUS * a.sin()));
    }
    for i in 0..n_straight {
        points.push(Point2D::new(STRAIGHT - STRAIGHT * i as f64 / n_straight as f64, 2.0 * RADIUS));
    }
    for i in 0..n_arc {
        let a = PI / 2.0 + PI * i as f64 / n_arc as f64;
        points.push(Point2D::new(RADIUS * a.cos(), RADIUS + RADIUS * a.sin()));
    }
    points
}

fn observe_all(traffic: &[SimVehicle], map: &GeometryMap, lanes: &LaneGeometry) -> TrafficSnapshot {
    TrafficSnapshot::from_vehicles(traffic.iter().map(|v| v.observe(map, lanes)).collect())
}

fn heading_of(points: &[Point2D], fallback: f64) -> f64 {
    match points {
        [.., a, b] if a.distance(b) > 1e-9 => a.heading_to(b),
        _ => fallback,
    }
}

fn main() -> PlanningResult<()> {
    env_logger::init();

    let reference = ReferencePath::from_polyline(&stadium())?;
    let track_length = reference.track_length();
    let interior = Point2D::new(STRAIGHT / 2.0, RADIUS);
    let map = GeometryMap::new(reference, interior);

    let config = PlannerConfig {
        map: GeometryMapConfig { track_length, interior_x: interior.x, interior_y: interior.y },
        policy: PolicyConfig { lane_change_enabled: true, ..PolicyConfig::default() },
        ..PlannerConfig::default()
    };
    config.validate()?;
    let lanes = config.lanes;
    let dt = config.generator.dt;
    let cycle = PlanningCycle::new(map, &config);

    let mut rng = StdRng::seed_from_u64(7);
    let speed_dist = Normal::<f64>::new(18.0, 3.0)
        .map_err(|e| PlanningError::InvalidParameter(e.to_string()))?;
    let mut traffic: Vec<SimVehicle> = (0..N_TRAFFIC)
        .map(|id| SimVehicle {
            id: id as i64,
            lane: rng.gen_range(0..lanes.count),
            s: rng.gen_range(60.0..track_length - 60.0),
            speed: speed_dist.sample(&mut rng).clamp(8.0, 21.0),
        })
        .collect();

    let start = cycle.map().to_cartesian(0.0, lanes.center(1));
    let mut pose = VehiclePose::new(start.x, start.y, 0.0, 0.0);
    let mut pending = Trajectory::new();
    let mut driven = Trajectory::from_points(vec![start]);
    let mut state = PlannerState::default();

    for tick in 0..TICKS {
        let ego = cycle.map().to_frenet(pose.position(), pose.yaw);
        let end = match pending.last() {
            Some(last) => cycle.map().to_frenet(last, heading_of(&pending.points, pose.yaw)),
            None => ego,
        };
        let snapshot = observe_all(&traffic, cycle.map(), &lanes);

        let telemetry = Telemetry {
            x: pose.x,
            y: pose.y,
            s: ego.s,
            d: ego.d,
            yaw: pose.yaw.to_degrees(),
            speed: pose.speed,
            previous_path_x: pending.x_coords(),
            previous_path_y: pending.y_coords(),
            end_path_s: end.s,
            end_path_d: end.d,
            sensor_fusion: snapshot.iter()
                .map(|v| vec![v.id as f64, v.x, v.y, v.vx, v.vy, v.s, v.d])
                .collect(),
        };

        let (next, trajectory) = cycle.step(state, &telemetry);
        state = next;
        let trajectory = trajectory.unwrap_or(pending);

        // execute the head of the trajectory
        let executed = EXECUTED.min(trajectory.len());
        let (head, tail) = trajectory.points.split_at(executed);
        if let Some(&last) = head.last() {
            let mut path = vec![pose.position()];
            path.extend_from_slice(head);
            let yaw = heading_of(&path, pose.yaw);
            let travelled = path[path.len() - 2].distance(&last);
            pose = VehiclePose::new(last.x, last.y, yaw, travelled / dt * MPS_TO_MPH);
            for &p in head {
                driven.push(p);
            }
        }
        pending = Trajectory::from_points(tail.to_vec());

        for vehicle in traffic.iter_mut() {
            vehicle.advance(track_length, dt * executed as f64);
        }

        if tick % 250 == 0 {
            info!(
                "tick {}: s {:.1}, d {:.2}, lane {}, target {:.2} mph, speed {:.2} mph",
                tick, ego.s, ego.d, state.lane, state.target_speed, pose.speed
            );
        }
    }

    let snapshot = observe_all(&traffic, cycle.map(), &lanes);
    let mut vis = Visualizer::new();
    vis.set_title("Highway planner")
        .set_window(interior, STRAIGHT / 2.0 + RADIUS + 20.0);
    vis.plot_road(cycle.map(), &lanes, 5.0)
        .plot_trajectory(&driven, &PathStyle::new(colors::HISTORY, "Driven").with_line_width(1.0))
        .plot_trajectory(&pending, &PathStyle::default())
        .plot_traffic(&snapshot)
        .plot_ego(&pose, 1.5);
    std::fs::create_dir_all("./img")?;
    vis.save_png("./img/highway_sim.png", 1200, 800)?;
    info!("Saved ./img/highway_sim.png after {} m", driven.total_length());
    Ok(())
}
