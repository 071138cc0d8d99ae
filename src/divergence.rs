//! Leading-fix divergence filtering
//!
//! Position receivers often emit a few wildly inaccurate fixes right after a cold
//! start. This module detects that leading run by comparing early step distances
//! against the median step and drops it.
//!
//! The rule is purely relative and works in raw degree space:
//! - series shorter than `max_points_to_check` are returned unchanged
//! - step distances are taken over the first `max_points_to_check` consecutive pairs
//! - a step is divergent when it exceeds `threshold_multiplier * median(steps)`
//! - scanning stops at the first non-divergent step, so a divergent step that
//!   follows a good one is kept

use crate::config::DivergenceConfig;
use crate::types::{DivergenceReport, PositionSeries};
use log::{debug, warn};

/// Minimum number of step distances needed for a meaningful median
const MIN_STEPS_FOR_MEDIAN: usize = 3;

/// Filter that strips a divergent prefix from a position series
pub struct DivergenceFilter;

impl DivergenceFilter {
    /// Detect and remove divergent leading fixes
    pub fn filter(series: &PositionSeries, config: &DivergenceConfig) -> DivergenceReport {
        let points_to_remove = Self::leading_divergent_count(series, config);

        if points_to_remove > 0 {
            warn!(
                "discarding {} divergent leading position fixes of {}",
                points_to_remove,
                series.len()
            );
            DivergenceReport {
                retained: series.without_leading(points_to_remove),
                removed_count: points_to_remove,
            }
        } else {
            DivergenceReport {
                retained: series.clone(),
                removed_count: 0,
            }
        }
    }

    /// Number of leading fixes that would be removed
    pub fn leading_divergent_count(series: &PositionSeries, config: &DivergenceConfig) -> usize {
        if series.len() < config.max_points_to_check {
            return 0;
        }

        let distances = leading_step_distances(series, config.max_points_to_check);
        if distances.len() < MIN_STEPS_FOR_MEDIAN {
            return 0;
        }

        let median_distance = median(&distances);
        let threshold = config.threshold_multiplier * median_distance;
        debug!(
            "divergence check: {} steps, median {:.3e}, threshold {:.3e}",
            distances.len(),
            median_distance,
            threshold
        );

        // Bounded prefix scan: stop at the first step within the threshold,
        // even if later steps exceed it.
        let mut last_divergent: Option<usize> = None;
        let mut i = 0;
        while i < distances.len() {
            if distances[i] > threshold {
                last_divergent = Some(i);
            } else {
                break;
            }
            i += 1;
        }

        last_divergent.map_or(0, |index| index + 1)
    }
}

/// Planar step distances for up to `max_pairs` leading consecutive pairs
fn leading_step_distances(series: &PositionSeries, max_pairs: usize) -> Vec<f64> {
    series
        .samples()
        .windows(2)
        .take(max_pairs)
        .map(|pair| pair[0].planar_distance(&pair[1]))
        .collect()
}

/// Median; mean of the two middle values for even-length input
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionSample;
    use pretty_assertions::assert_eq;

    /// Walk north in small uniform steps from a base point
    fn uniform_track(n: usize, step: f64) -> Vec<PositionSample> {
        (0..n)
            .map(|i| PositionSample::new(-23.55 + i as f64 * step, -46.63))
            .collect()
    }

    /// Track whose first `bad` fixes sit far away, then converge on a uniform walk
    fn cold_start_track(n: usize, bad: usize) -> PositionSeries {
        let mut samples = uniform_track(n, 0.00001);
        for (i, sample) in samples.iter_mut().take(bad).enumerate() {
            // Alternate far east/west so every leading step is large
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sample.lon += sign * 0.01;
        }
        PositionSeries::new(samples)
    }

    #[test]
    fn test_removes_divergent_prefix() {
        let series = cold_start_track(10, 3);
        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());

        assert_eq!(report.removed_count, 3);
        assert_eq!(report.retained.len(), 7);
        assert_eq!(report.retained.first(), Some(&series.samples()[3]));
        assert_eq!(report.retained.samples(), &series.samples()[3..]);
    }

    #[test]
    fn test_short_series_unchanged() {
        let series = cold_start_track(5, 2);
        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());

        assert_eq!(report.removed_count, 0);
        assert_eq!(report.retained, series);
    }

    #[test]
    fn test_uniform_steps_unchanged() {
        let mut samples = uniform_track(30, 0.00001);
        // Slight jitter, well under 2x the median step
        for (i, sample) in samples.iter_mut().enumerate() {
            sample.lon += if i % 3 == 0 { 0.000002 } else { 0.0 };
        }
        let series = PositionSeries::new(samples);
        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());

        assert_eq!(report.removed_count, 0);
        assert_eq!(report.retained, series);
    }

    #[test]
    fn test_stops_at_first_good_step() {
        // Step 0 divergent, step 1 good, step 2 divergent again
        let mut samples = uniform_track(12, 0.00001);
        samples[0].lon += 0.01;
        samples[3].lon += 0.01;
        let series = PositionSeries::new(samples);

        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());
        assert_eq!(report.removed_count, 1);
        assert_eq!(report.retained.first(), Some(&series.samples()[1]));
    }

    #[test]
    fn test_first_step_good_removes_nothing() {
        let mut samples = uniform_track(12, 0.00001);
        samples[2].lon += 0.01;
        let series = PositionSeries::new(samples);

        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());
        assert_eq!(report.removed_count, 0);
    }

    #[test]
    fn test_only_leading_window_inspected() {
        // A jump far past the inspected window does not matter
        let mut samples = uniform_track(40, 0.00001);
        samples[30].lat += 1.0;
        let series = PositionSeries::new(samples);

        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());
        assert_eq!(report.removed_count, 0);
    }

    #[test]
    fn test_idempotent() {
        let series = cold_start_track(25, 4);
        let config = DivergenceConfig::default();

        let first = DivergenceFilter::filter(&series, &config);
        assert_eq!(first.removed_count, 4);

        let second = DivergenceFilter::filter(&first.retained, &config);
        assert_eq!(second.removed_count, 0);
        assert_eq!(second.retained, first.retained);
    }

    #[test]
    fn test_idempotent_when_result_is_short() {
        let series = cold_start_track(10, 3);
        let config = DivergenceConfig::default();

        let first = DivergenceFilter::filter(&series, &config);
        let second = DivergenceFilter::filter(&first.retained, &config);
        assert_eq!(second.removed_count, 0);
    }

    #[test]
    fn test_second_pass_after_inflated_median() {
        // Steps [10, 10, 10, 10, 3, 1, 1, ...]: the divergent steps pull the
        // first median up to 2, so the 3-step survives the first pass and only
        // becomes divergent once the prefix is gone.
        let steps = [10.0, 10.0, 10.0, 10.0, 3.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let mut lat = 0.0;
        let mut samples = vec![PositionSample::new(lat, 0.0)];
        for step in steps {
            lat += step;
            samples.push(PositionSample::new(lat, 0.0));
        }
        let series = PositionSeries::new(samples);
        let config = DivergenceConfig::default();

        let first = DivergenceFilter::filter(&series, &config);
        assert_eq!(first.removed_count, 4);

        let second = DivergenceFilter::filter(&first.retained, &config);
        assert_eq!(second.removed_count, 1);

        let third = DivergenceFilter::filter(&second.retained, &config);
        assert_eq!(third.removed_count, 0);
    }

    #[test]
    fn test_too_few_steps_for_median() {
        let config = DivergenceConfig {
            max_points_to_check: 2,
            ..Default::default()
        };
        let series = cold_start_track(10, 1);
        let report = DivergenceFilter::filter(&series, &config);
        assert_eq!(report.removed_count, 0);
    }

    #[test]
    fn test_stationary_track() {
        let series = PositionSeries::new(vec![PositionSample::new(1.0, 1.0); 15]);
        let report = DivergenceFilter::filter(&series, &DivergenceConfig::default());
        assert_eq!(report.removed_count, 0);
    }

    #[test]
    fn test_custom_multiplier() {
        // Leading steps at 3x the median: divergent at 2x, accepted at 4x
        let mut samples = Vec::new();
        let mut lat = 0.0;
        for i in 0..12 {
            samples.push(PositionSample::new(lat, 0.0));
            lat += if i < 2 { 3.0 } else { 1.0 };
        }
        let series = PositionSeries::new(samples);

        let strict = DivergenceFilter::filter(&series, &DivergenceConfig::default());
        assert_eq!(strict.removed_count, 2);

        let lenient = DivergenceConfig {
            threshold_multiplier: 4.0,
            ..Default::default()
        };
        assert_eq!(DivergenceFilter::filter(&series, &lenient).removed_count, 0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }
}
