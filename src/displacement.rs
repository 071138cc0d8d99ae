//! Displacement estimation
//!
//! Per axis, independently: smooth the acceleration, integrate once to velocity,
//! integrate again to displacement. There is no cross-axis coupling and no frame
//! rotation, so the result is expressed in the device frame. Both integrations
//! start from zero, so any accelerometer bias grows quadratically in the output.

use crate::config::SmoothingConfig;
use crate::error::TrajectoryError;
use crate::filter::SignalFilter;
use crate::integrator::Integrator;
use crate::types::{AccelerationCapture, Axis, DisplacementSeries, ScalarSignal};
use log::debug;

/// Estimator turning triaxial acceleration into per-step displacement
pub struct DisplacementEstimator;

impl DisplacementEstimator {
    /// Estimate displacement from three acceleration axes on a shared time base
    pub fn estimate(
        accel_x: &[f64],
        accel_y: &[f64],
        accel_z: &[f64],
        timestamps: &[f64],
        smoothing: &SmoothingConfig,
    ) -> Result<DisplacementSeries, TrajectoryError> {
        let capture = AccelerationCapture::new(
            timestamps.to_vec(),
            accel_x.to_vec(),
            accel_y.to_vec(),
            accel_z.to_vec(),
        )?;
        Self::estimate_capture(&capture, smoothing)
    }

    /// Estimate displacement for a loaded acceleration capture
    pub fn estimate_capture(
        capture: &AccelerationCapture,
        smoothing: &SmoothingConfig,
    ) -> Result<DisplacementSeries, TrajectoryError> {
        capture.validate()?;

        let dx = displacement_for_axis(&capture.axis(Axis::X)?, smoothing)?;
        let dy = displacement_for_axis(&capture.axis(Axis::Y)?, smoothing)?;
        let dz = displacement_for_axis(&capture.axis(Axis::Z)?, smoothing)?;

        debug!(
            "displacement over {} samples: final ({:.3}, {:.3}, {:.3}) m",
            capture.len(),
            dx.final_value(),
            dy.final_value(),
            dz.final_value()
        );

        Ok(DisplacementSeries {
            dx,
            dy,
            dz,
            sample_count: capture.len(),
        })
    }
}

/// Acceleration → smoothed acceleration → velocity → displacement
fn displacement_for_axis(
    acceleration: &ScalarSignal,
    smoothing: &SmoothingConfig,
) -> Result<ScalarSignal, TrajectoryError> {
    let velocity = velocity_for_axis(acceleration, smoothing)?;
    Ok(Integrator::cumulative_integrate(&velocity))
}

/// Velocity series for one axis, for callers that want the intermediate stage
pub fn velocity_for_axis(
    acceleration: &ScalarSignal,
    smoothing: &SmoothingConfig,
) -> Result<ScalarSignal, TrajectoryError> {
    let smoothed = SignalFilter::smooth(acceleration, smoothing)?;
    Ok(Integrator::cumulative_integrate(&smoothed))
}

/// Upper bound on generated captures
const MAX_GENERATED_STEPS: usize = 100_000_000;

/// Uniformly sampled constant-acceleration capture, used by tests and the demo
pub fn constant_acceleration_capture(
    accel: [f64; 3],
    sample_rate_hz: f64,
    duration_sec: f64,
) -> Result<AccelerationCapture, TrajectoryError> {
    if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
        return Err(TrajectoryError::InvalidParameter(format!(
            "sample rate must be positive, got {}",
            sample_rate_hz
        )));
    }
    if !(duration_sec.is_finite() && duration_sec >= 0.0) {
        return Err(TrajectoryError::InvalidParameter(format!(
            "duration must be non-negative, got {}",
            duration_sec
        )));
    }
    let steps = (duration_sec * sample_rate_hz).round();
    if steps > MAX_GENERATED_STEPS as f64 {
        return Err(TrajectoryError::InvalidParameter(format!(
            "{} s at {} Hz exceeds {} samples",
            duration_sec, sample_rate_hz, MAX_GENERATED_STEPS
        )));
    }
    let n = steps as usize + 1;
    let timestamps: Vec<f64> = (0..n).map(|i| i as f64 / sample_rate_hz).collect();

    AccelerationCapture::new(
        timestamps,
        vec![accel[0]; n],
        vec![accel[1]; n],
        vec![accel[2]; n],
    )
}
