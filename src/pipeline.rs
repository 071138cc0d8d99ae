//! Pipeline orchestration
//!
//! This module provides the public API for Trajecto.
//! It orchestrates the full pipeline from a stored capture to the JSON report
//! and map page.

use crate::capture::{CaptureLoader, SensorCapture};
use crate::config::PipelineConfig;
use crate::displacement::DisplacementEstimator;
use crate::divergence::DivergenceFilter;
use crate::encoder::ReportEncoder;
use crate::error::TrajectoryError;
use crate::frequency::FrequencyEstimator;
use crate::map::MapRenderer;
use crate::types::{AccelerationCapture, DeviceInfo, PositionSeries, TrajectoryEstimate, TrajectoryReport};
use log::{debug, info};
use std::path::Path;

/// Run the core stages on one capture.
///
/// Pipeline stages:
/// 1. FrequencyEstimator - Effective sampling rate of the acceleration stream
/// 2. DisplacementEstimator - Smooth, then integrate twice per axis
/// 3. DivergenceFilter - Strip divergent leading position fixes
///
/// The two sensor streams are processed independently; no reconciliation is
/// attempted between the inertial and position estimates.
pub fn estimate_trajectory(
    acceleration: &AccelerationCapture,
    positions: &PositionSeries,
    config: &PipelineConfig,
) -> Result<TrajectoryEstimate, TrajectoryError> {
    config.validate()?;

    // Stage 1: Sampling rate (0.0 when unknown, never an error)
    let sampling = FrequencyEstimator::estimate_frequency(&acceleration.timestamps);
    debug!(
        "sampling: {:.3} Hz over {} samples",
        sampling.frequency_hz, sampling.sample_count
    );

    // Stage 2: Displacement
    let displacement = DisplacementEstimator::estimate_capture(acceleration, &config.smoothing)?;

    // Stage 3: Position cleanup
    let divergence = DivergenceFilter::filter(positions, &config.divergence);

    Ok(TrajectoryEstimate {
        displacement,
        sampling,
        divergence,
    })
}

/// Load a capture directory and return its report as JSON.
///
/// # Example
/// ```ignore
/// let report_json = capture_dir_to_report("captures/walk-01", &PipelineConfig::default())?;
/// ```
pub fn capture_dir_to_report<P: AsRef<Path>>(
    dir: P,
    config: &PipelineConfig,
) -> Result<String, TrajectoryError> {
    let processor = TrajectoryProcessor::with_config(config.clone())?;
    processor.process_dir(dir)?.to_json()
}

/// Result of processing one capture: the numbers and the encoded report
#[derive(Debug, Clone)]
pub struct ProcessedCapture {
    pub estimate: TrajectoryEstimate,
    pub report: TrajectoryReport,
}

impl ProcessedCapture {
    /// Report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, TrajectoryError> {
        serde_json::to_string_pretty(&self.report).map_err(TrajectoryError::JsonError)
    }

    /// Position fixes left after divergence filtering
    pub fn retained_track(&self) -> &PositionSeries {
        &self.estimate.divergence.retained
    }
}

/// Reusable processor holding a validated configuration and an encoder.
///
/// Use this when processing several captures with the same settings, so every
/// report carries the same producer instance ID.
pub struct TrajectoryProcessor {
    config: PipelineConfig,
    encoder: ReportEncoder,
}

impl Default for TrajectoryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrajectoryProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self, TrajectoryError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: ReportEncoder::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        self.encoder.instance_id()
    }

    /// Process an already loaded capture
    pub fn process_capture(
        &self,
        capture: &SensorCapture,
    ) -> Result<ProcessedCapture, TrajectoryError> {
        self.process_streams(&capture.acceleration, &capture.positions, &capture.device)
    }

    /// Load and process a capture export directory
    pub fn process_dir<P: AsRef<Path>>(&self, dir: P) -> Result<ProcessedCapture, TrajectoryError> {
        let capture = CaptureLoader::load_dir(dir)?;
        self.process_capture(&capture)
    }

    /// Process JSON-encoded streams and return the report JSON
    pub fn process_json(
        &self,
        acceleration_json: &str,
        positions_json: &str,
    ) -> Result<String, TrajectoryError> {
        let acceleration = CaptureLoader::acceleration_from_json(acceleration_json)?;
        let positions = CaptureLoader::positions_from_json(positions_json)?;
        self.process_streams(&acceleration, &positions, &DeviceInfo::default())?
            .to_json()
    }

    /// Render the retained track of a processed capture as an HTML map page
    pub fn render_map(&self, processed: &ProcessedCapture) -> Result<String, TrajectoryError> {
        MapRenderer::render_html(processed.retained_track(), &self.config.map)
    }

    fn process_streams(
        &self,
        acceleration: &AccelerationCapture,
        positions: &PositionSeries,
        device: &DeviceInfo,
    ) -> Result<ProcessedCapture, TrajectoryError> {
        let estimate = estimate_trajectory(acceleration, positions, &self.config)?;
        let report = self
            .encoder
            .encode(&estimate, device, self.config.full_series)?;

        info!(
            "trajectory: {:.3} m over {:.2} s, {} of {} fixes retained",
            report.displacement.magnitude_m,
            report.displacement.duration_sec,
            report.positions.retained_count,
            positions.len()
        );

        Ok(ProcessedCapture { estimate, report })
    }
}
