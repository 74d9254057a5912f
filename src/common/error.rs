//! Error types for highway_planner

use std::fmt;

/// Main error type for the planning core
#[derive(Debug)]
pub enum PlanningError {
    /// Reference path missing, empty or inconsistent
    OutOfRangeInput(String),
    /// Tick input violates its shape invariants
    MalformedTelemetry(String),
    /// Numerical computation failed (degenerate spline anchors, singular system)
    NumericalError(String),
    /// Invalid configuration parameter
    InvalidParameter(String),
    /// I/O error
    IoError(std::io::Error),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningError::OutOfRangeInput(msg) => write!(f, "Out of range input: {}", msg),
            PlanningError::MalformedTelemetry(msg) => write!(f, "Malformed telemetry: {}", msg),
            PlanningError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            PlanningError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PlanningError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PlanningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanningError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlanningError {
    fn from(e: std::io::Error) -> Self {
        PlanningError::IoError(e)
    }
}

impl From<serde_json::Error> for PlanningError {
    fn from(e: serde_json::Error) -> Self {
        PlanningError::MalformedTelemetry(e.to_string())
    }
}

impl From<serde_yaml::Error> for PlanningError {
    fn from(e: serde_yaml::Error) -> Self {
        PlanningError::InvalidParameter(e.to_string())
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
