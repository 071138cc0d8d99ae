//! Trajecto - Trajectory estimation from smartphone sensor captures
//!
//! Trajecto turns a stored phone-sensor capture into a trajectory estimate through
//! a deterministic pipeline: capture loading → sampling-rate estimation →
//! smoothing → double integration → position cleanup → report encoding.
//!
//! ## Modules
//!
//! - **Inertial path**: Triaxial acceleration → per-axis displacement (device frame)
//! - **Position path**: Position fixes → track with divergent leading fixes removed
//! - **Presenters**: JSON report and HTML map page

pub mod capture;
pub mod config;
pub mod displacement;
pub mod divergence;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod frequency;
pub mod integrator;
pub mod map;
pub mod pipeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use capture::{CaptureLoader, SensorCapture};
pub use config::{DivergenceConfig, MapConfig, PipelineConfig, SmoothingConfig};
pub use displacement::DisplacementEstimator;
pub use divergence::DivergenceFilter;
pub use encoder::ReportEncoder;
pub use error::TrajectoryError;
pub use filter::SignalFilter;
pub use frequency::FrequencyEstimator;
pub use integrator::Integrator;
pub use map::MapRenderer;
pub use pipeline::{capture_dir_to_report, estimate_trajectory, ProcessedCapture, TrajectoryProcessor};
pub use types::{
    AccelerationCapture, DisplacementSeries, DisplacementVector, DivergenceReport,
    PositionSample, PositionSeries, SamplingStats, ScalarSignal, TimeSeries, TrajectoryEstimate,
    TrajectoryReport,
};

/// Trajecto version embedded in all reports
pub const TRAJECTO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "trajecto";
