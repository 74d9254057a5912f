// Mapping module: reference path storage and coordinate transforms

pub mod reference_path;
pub mod geometry_map;

pub use reference_path::*;
pub use geometry_map::*;
