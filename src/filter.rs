//! Signal smoothing
//!
//! Local polynomial-regression smoothing (Savitzky–Golay). Each sample is replaced
//! by the value of a least-squares polynomial fitted over the window around it.
//! The leading and trailing half-windows are evaluated from the polynomial fitted
//! to the first and last full window, so the output keeps the input's length and
//! time base. The fit is over sample index; timestamps are carried through untouched.

use crate::config::SmoothingConfig;
use crate::error::TrajectoryError;
use crate::types::ScalarSignal;
use nalgebra::{DMatrix, DVector};

/// Smoother for noisy scalar signals
pub struct SignalFilter;

impl SignalFilter {
    /// Smooth a signal with the given window/degree
    pub fn smooth(
        signal: &ScalarSignal,
        config: &SmoothingConfig,
    ) -> Result<ScalarSignal, TrajectoryError> {
        let smoothed = smooth_values(signal.values(), config)?;
        Ok(signal.with_values(smoothed))
    }
}

/// Smooth a plain sample slice
pub fn smooth_values(values: &[f64], config: &SmoothingConfig) -> Result<Vec<f64>, TrajectoryError> {
    config.validate()?;

    let window = config.window;
    let n = values.len();
    if n < window {
        return Err(TrajectoryError::insufficient(window, n));
    }

    let half = window / 2;
    let mut out = vec![0.0; n];

    // Interior: fixed convolution weights centered on each sample
    let center = fit_weights(window, config.degree, 0.0)?;
    for i in half..n - half {
        out[i] = dot(&center, &values[i - half..=i + half]);
    }

    // Edges: evaluate the first/last full-window fit at the uncovered positions
    let head = &values[..window];
    let tail = &values[n - window..];
    for offset in 0..half {
        let lead = fit_weights(window, config.degree, offset as f64 - half as f64)?;
        out[offset] = dot(&lead, head);

        let trail = fit_weights(window, config.degree, (offset + 1) as f64)?;
        out[n - half + offset] = dot(&trail, tail);
    }

    Ok(out)
}

/// Weights `w` such that `sum(w[j] * y[j])` is the least-squares polynomial of
/// `degree` through `window` samples, evaluated at position `at`.
///
/// Sample `j` sits at position `j - window / 2`, so `at = 0.0` is the window center.
fn fit_weights(window: usize, degree: usize, at: f64) -> Result<Vec<f64>, TrajectoryError> {
    let half = (window / 2) as f64;
    let terms = degree + 1;

    // Design matrix A[j][k] = x_j^k, target p[k] = at^k
    let design = DMatrix::from_fn(window, terms, |j, k| (j as f64 - half).powi(k as i32));
    let target = DVector::from_fn(terms, |k, _| at.powi(k as i32));

    // Normal equations (AᵀA) b = p, then w = A b
    let normal = design.transpose() * &design;
    let b = normal
        .cholesky()
        .ok_or_else(|| {
            TrajectoryError::InvalidParameter(
                "smoothing window is degenerate for the requested degree".to_string(),
            )
        })?
        .solve(&target);

    Ok((design * b).iter().copied().collect())
}

fn dot(weights: &[f64], values: &[f64]) -> f64 {
    weights.iter().zip(values).map(|(w, v)| w * v).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeSeries;

    fn uniform_signal(values: Vec<f64>) -> ScalarSignal {
        let timestamps = (0..values.len()).map(|i| i as f64 * 0.01).collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn test_center_weights_match_published_table() {
        // Savitzky–Golay quadratic/cubic, 7 points: (-2, 3, 6, 7, 6, 3, -2) / 21
        let weights = fit_weights(7, 3, 0.0).unwrap();
        let expected = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0];
        for (w, e) in weights.iter().zip(expected) {
            assert!((w - e / 21.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_quadratic_five_point_weights() {
        // (-3, 12, 17, 12, -3) / 35
        let weights = fit_weights(5, 2, 0.0).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        assert_eq!(weights.len(), 5);
        for (w, e) in weights.iter().zip(expected) {
            assert!((w - e / 35.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_edge_weights_reproduce_line() {
        // Evaluating the fit off-center reproduces a straight line exactly
        let values: Vec<f64> = (0..7).map(|j| 2.0 * j as f64 + 3.0).collect();
        let weights = fit_weights(7, 3, -3.0).unwrap();
        assert!((dot(&weights, &values) - 3.0).abs() < 1e-9);

        let weights = fit_weights(7, 3, 3.0).unwrap();
        assert!((dot(&weights, &values) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_sum_to_one() {
        for at in [-3.0, -1.0, 0.0, 2.0, 3.0] {
            let weights = fit_weights(7, 3, at).unwrap();
            let sum: f64 = weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_preserves_length_and_timestamps() {
        let signal = uniform_signal((0..50).map(|i| (i as f64 * 0.3).sin()).collect());
        let smoothed = SignalFilter::smooth(&signal, &SmoothingConfig::default()).unwrap();

        assert_eq!(smoothed.len(), signal.len());
        assert_eq!(smoothed.timestamps(), signal.timestamps());
    }

    #[test]
    fn test_preserves_constant() {
        let signal = uniform_signal(vec![9.81; 20]);
        let smoothed = SignalFilter::smooth(&signal, &SmoothingConfig::default()).unwrap();

        for v in smoothed.values() {
            assert!((v - 9.81).abs() < 1e-9);
        }
    }

    #[test]
    fn test_preserves_cubic_including_edges() {
        let values: Vec<f64> = (0..15)
            .map(|i| {
                let x = i as f64;
                0.5 * x * x * x - 2.0 * x * x + x - 4.0
            })
            .collect();
        let signal = uniform_signal(values.clone());
        let smoothed = SignalFilter::smooth(&signal, &SmoothingConfig::default()).unwrap();

        for (s, v) in smoothed.values().iter().zip(&values) {
            assert!((s - v).abs() < 1e-6, "{} vs {}", s, v);
        }
    }

    #[test]
    fn test_reduces_alternating_noise() {
        let values: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let signal = uniform_signal(values);
        let smoothed = SignalFilter::smooth(&signal, &SmoothingConfig::default()).unwrap();

        // Interior samples are strongly attenuated
        for v in &smoothed.values()[3..27] {
            assert!(v.abs() < 0.5);
        }
    }

    #[test]
    fn test_insufficient_samples() {
        let signal = uniform_signal(vec![1.0; 6]);
        let result = SignalFilter::smooth(&signal, &SmoothingConfig::default());
        assert!(matches!(
            result,
            Err(TrajectoryError::InsufficientSamples {
                required: 7,
                actual: 6
            })
        ));

        // Exactly one window is enough
        let signal = uniform_signal(vec![1.0; 7]);
        assert!(SignalFilter::smooth(&signal, &SmoothingConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_window_rejected() {
        let signal = uniform_signal(vec![1.0; 20]);
        let result = SignalFilter::smooth(&signal, &SmoothingConfig::new(6, 3));
        assert!(matches!(result, Err(TrajectoryError::InvalidParameter(_))));
    }

    #[test]
    fn test_custom_window() {
        let signal = uniform_signal((0..40).map(|i| (i as f64).sqrt()).collect());
        let smoothed = SignalFilter::smooth(&signal, &SmoothingConfig::new(11, 2)).unwrap();
        assert_eq!(smoothed.len(), 40);
    }
}
