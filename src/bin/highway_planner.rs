// Highway planner frame driver
//
// Reads simulator frames from stdin, one per line, and answers each
// telemetry frame with a control frame on stdout.
//
// usage: highway_planner <map file> [config.yaml]
use std::env;
use std::io::{self, BufRead, Write};

use log::{error, info};

use highway_planner::planner::{control_frame, parse_frame, SimulatorEvent, MANUAL_FRAME};
use highway_planner::{GeometryMap, PlannerConfig, PlannerState, PlanningCycle, PlanningError, PlanningResult};

fn main() -> PlanningResult<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let map_path = args.get(1)
        .ok_or_else(|| PlanningError::InvalidParameter("usage: highway_planner <map file> [config.yaml]".to_string()))?;
    let config = match args.get(2) {
        Some(path) => PlannerConfig::from_yaml_file(path)?,
        None => PlannerConfig::default(),
    };

    let map = GeometryMap::load(map_path, &config.map)?;
    let cycle = PlanningCycle::new(map, &config);
    let mut state = PlannerState::default();
    info!(
        "Planner ready: {} waypoints, lane {}, ceiling {} mph",
        cycle.map().reference().len(),
        state.lane,
        config.policy.cruise_ceiling
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let event = match parse_frame(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                error!("Dropping frame: {}", e);
                continue;
            }
        };

        match event {
            SimulatorEvent::Manual => writeln!(out, "{}", MANUAL_FRAME)?,
            SimulatorEvent::Telemetry(telemetry) => {
                let (next, trajectory) = cycle.step(state, &telemetry);
                state = next;
                if let Some(trajectory) = trajectory {
                    writeln!(out, "{}", control_frame(&trajectory)?)?;
                }
            }
        }
        out.flush()?;
    }
    Ok(())
}
