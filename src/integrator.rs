//! Cumulative integration
//!
//! Trapezoidal cumulative integral of a sampled signal against its timestamps.
//! The integration constant is always zero: the output is anchored at 0 on the
//! first sample, so any sensor bias is carried through uncorrected.

use crate::error::TrajectoryError;
use crate::types::ScalarSignal;

/// Trapezoidal integrator
pub struct Integrator;

impl Integrator {
    /// `out[0] = 0`, `out[i] = out[i-1] + (t[i] - t[i-1]) * (v[i] + v[i-1]) / 2`
    pub fn cumulative_integrate(signal: &ScalarSignal) -> ScalarSignal {
        let integrated = running_trapezoid(signal.timestamps(), signal.values());
        signal.with_values(integrated)
    }
}

/// Trapezoidal running integral over parallel time/value slices
pub fn cumulative_trapezoid(timestamps: &[f64], values: &[f64]) -> Result<Vec<f64>, TrajectoryError> {
    if timestamps.len() != values.len() {
        return Err(TrajectoryError::MalformedSeries(format!(
            "{} timestamps but {} values",
            timestamps.len(),
            values.len()
        )));
    }
    Ok(running_trapezoid(timestamps, values))
}

fn running_trapezoid(timestamps: &[f64], values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }

    let mut acc = 0.0;
    out.push(acc);
    for (t, v) in timestamps.windows(2).zip(values.windows(2)) {
        acc += (t[1] - t[0]) * (v[1] + v[0]) / 2.0;
        out.push(acc);
    }
    out
}
