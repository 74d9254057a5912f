// Planner module: tick orchestration, configuration and simulator plumbing

pub mod config;
pub mod cycle;
pub mod telemetry;

pub use config::*;
pub use cycle::*;
pub use telemetry::*;
