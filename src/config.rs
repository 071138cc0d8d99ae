//! Pipeline configuration
//!
//! Every tuning constant of the pipeline is an explicit parameter with a default,
//! passed into each stage. Configuration can be loaded from a TOML file; missing
//! sections and keys fall back to the defaults.

use crate::error::TrajectoryError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default smoothing window (samples, odd)
pub const DEFAULT_SMOOTHING_WINDOW: usize = 7;

/// Default smoothing polynomial degree
pub const DEFAULT_SMOOTHING_DEGREE: usize = 3;

/// Default number of leading fixes inspected for divergence
pub const DEFAULT_MAX_POINTS_TO_CHECK: usize = 10;

/// Default multiple of the median step above which a step is divergent
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 2.0;

/// Local polynomial smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Window length in samples; odd and at least `degree + 2`
    pub window: usize,
    /// Degree of the fitted polynomial
    pub degree: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_SMOOTHING_WINDOW,
            degree: DEFAULT_SMOOTHING_DEGREE,
        }
    }
}

impl SmoothingConfig {
    pub fn new(window: usize, degree: usize) -> Self {
        Self { window, degree }
    }

    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.window % 2 == 0 {
            return Err(TrajectoryError::InvalidParameter(format!(
                "smoothing window must be odd, got {}",
                self.window
            )));
        }
        if self.window < self.degree + 2 {
            return Err(TrajectoryError::InvalidParameter(format!(
                "smoothing window {} too small for degree {} (need at least {})",
                self.window,
                self.degree,
                self.degree + 2
            )));
        }
        Ok(())
    }
}

/// Leading-fix divergence detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Number of leading step distances inspected; shorter series are left untouched
    pub max_points_to_check: usize,
    /// A step is divergent when it exceeds `threshold_multiplier * median_step`
    pub threshold_multiplier: f64,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            max_points_to_check: DEFAULT_MAX_POINTS_TO_CHECK,
            threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
        }
    }
}

impl DivergenceConfig {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.max_points_to_check < 2 {
            return Err(TrajectoryError::InvalidParameter(format!(
                "max_points_to_check must be at least 2, got {}",
                self.max_points_to_check
            )));
        }
        if !(self.threshold_multiplier.is_finite() && self.threshold_multiplier > 0.0) {
            return Err(TrajectoryError::InvalidParameter(format!(
                "threshold_multiplier must be positive, got {}",
                self.threshold_multiplier
            )));
        }
        Ok(())
    }
}

/// Map page rendering options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial zoom level, centered on the first retained fix
    pub zoom_start: u8,
    /// Track polyline color (any CSS color)
    pub line_color: String,
    /// Track polyline weight in pixels
    pub line_weight: u32,
    /// Place a numbered marker on every fix
    pub show_markers: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom_start: 20,
            line_color: "blue".to_string(),
            line_weight: 3,
            show_markers: true,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Include full per-step series in the report, not just final values
    pub full_series: bool,
    pub smoothing: SmoothingConfig,
    pub divergence: DivergenceConfig,
    pub map: MapConfig,
}

impl PipelineConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, TrajectoryError> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|e| TrajectoryError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, TrajectoryError> {
        toml::to_string_pretty(self).map_err(|e| TrajectoryError::ConfigError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), TrajectoryError> {
        self.smoothing.validate()?;
        self.divergence.validate()?;
        if self.map.zoom_start > 24 {
            return Err(TrajectoryError::InvalidParameter(format!(
                "map zoom_start must be at most 24, got {}",
                self.map.zoom_start
            )));
        }
        Ok(())
    }
}
