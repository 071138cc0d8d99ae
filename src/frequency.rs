//! Sampling rate estimation

use crate::types::SamplingStats;

/// Estimator for the effective sampling rate of a captured stream
pub struct FrequencyEstimator;

impl FrequencyEstimator {
    /// Average rate over the whole capture.
    ///
    /// Degenerate input (fewer than two samples, or no elapsed time) reports a
    /// frequency of 0.0, which downstream treats as "unknown" rather than an error.
    pub fn estimate_frequency(timestamps: &[f64]) -> SamplingStats {
        let count = timestamps.len();
        let frequency_hz = match (timestamps.first(), timestamps.last()) {
            (Some(first), Some(last)) if count > 1 => {
                let avg_interval = (last - first) / (count - 1) as f64;
                if avg_interval > 0.0 {
                    1.0 / avg_interval
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        SamplingStats {
            frequency_hz,
            sample_count: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_spacing() {
        let stats = FrequencyEstimator::estimate_frequency(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(stats.frequency_hz, 1.0);
        assert_eq!(stats.sample_count, 4);
    }

    #[test]
    fn test_single_sample_is_unknown() {
        let stats = FrequencyEstimator::estimate_frequency(&[5.0]);
        assert_eq!(stats.frequency_hz, 0.0);
        assert_eq!(stats.sample_count, 1);
    }

    #[test]
    fn test_empty_is_unknown() {
        let stats = FrequencyEstimator::estimate_frequency(&[]);
        assert_eq!(stats.frequency_hz, 0.0);
        assert_eq!(stats.sample_count, 0);
    }

    #[test]
    fn test_zero_duration_is_unknown() {
        let stats = FrequencyEstimator::estimate_frequency(&[2.0, 2.0, 2.0]);
        assert_eq!(stats.frequency_hz, 0.0);
        assert_eq!(stats.sample_count, 3);
    }

    #[test]
    fn test_jittered_hundred_hz() {
        // Average interval is what counts, not individual gaps
        let timestamps = [0.0, 0.009, 0.021, 0.030, 0.040];
        let stats = FrequencyEstimator::estimate_frequency(&timestamps);
        assert!((stats.frequency_hz - 100.0).abs() < 1e-9);
    }
}
