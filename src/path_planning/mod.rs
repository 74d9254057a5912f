// Path Planning module: anchor spline and trajectory synthesis

pub mod cubic_spline;
pub mod trajectory_generator;

pub use cubic_spline::*;
pub use trajectory_generator::*;
