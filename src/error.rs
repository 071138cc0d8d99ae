//! Error types for Trajecto

use thiserror::Error;

/// Errors that can occur while loading a capture or computing a trajectory
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Malformed series: {0}")]
    MalformedSeries(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Failed to parse capture: {0}")]
    ParseError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl TrajectoryError {
    /// Shorthand for a series that is shorter than a stage requires
    pub fn insufficient(required: usize, actual: usize) -> Self {
        TrajectoryError::InsufficientSamples { required, actual }
    }

    /// True for errors caused by the shape of the input data rather than I/O or configuration
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            TrajectoryError::InsufficientSamples { .. }
                | TrajectoryError::MalformedSeries(_)
                | TrajectoryError::MissingColumn(_)
                | TrajectoryError::ParseError(_)
        )
    }
}
