// Behavior Planning module: reactive target speed and lane selection

pub mod speed_lane_policy;

pub use speed_lane_policy::*;
