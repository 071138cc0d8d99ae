//! Core types for the Trajecto pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: captured series, derived signals, stage results and the report payload.

use crate::error::TrajectoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Check that timestamps are finite and strictly increasing
pub fn validate_timestamps(timestamps: &[f64]) -> Result<(), TrajectoryError> {
    if let Some(i) = timestamps.iter().position(|t| !t.is_finite()) {
        return Err(TrajectoryError::MalformedSeries(format!(
            "non-finite timestamp at index {}",
            i
        )));
    }

    for (i, pair) in timestamps.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(TrajectoryError::MalformedSeries(format!(
                "timestamps not strictly increasing at index {} ({} -> {})",
                i + 1,
                pair[0],
                pair[1]
            )));
        }
    }

    Ok(())
}

/// Ordered sequence of `(t, v)` samples with strictly increasing `t` (seconds).
///
/// Timestamps and values are stored as parallel vectors. A series is immutable
/// once built; stages produce new series instead of editing existing ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries<T> {
    timestamps: Vec<f64>,
    values: Vec<T>,
}

/// One acceleration axis, or anything derived from it
pub type ScalarSignal = TimeSeries<f64>;

impl<T> TimeSeries<T> {
    /// Build a series, rejecting mismatched lengths and non-increasing timestamps
    pub fn new(timestamps: Vec<f64>, values: Vec<T>) -> Result<Self, TrajectoryError> {
        if timestamps.len() != values.len() {
            return Err(TrajectoryError::MalformedSeries(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        validate_timestamps(&timestamps)?;
        Ok(Self { timestamps, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn first(&self) -> Option<(f64, &T)> {
        self.timestamps.first().copied().zip(self.values.first())
    }

    pub fn last(&self) -> Option<(f64, &T)> {
        self.timestamps.last().copied().zip(self.values.last())
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &T)> {
        self.timestamps.iter().copied().zip(self.values.iter())
    }

    /// Total covered time (seconds); zero for fewer than two samples
    pub fn duration(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// New series on the same time base. `values` must match `self.len()`.
    pub(crate) fn with_values<U>(&self, values: Vec<U>) -> TimeSeries<U> {
        debug_assert_eq!(values.len(), self.timestamps.len());
        TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
        }
    }
}

impl ScalarSignal {
    /// Final value, or 0.0 for an empty signal
    pub fn final_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }
}

/// Acceleration axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Triaxial acceleration capture (m/s²) on a shared time base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerationCapture {
    /// Sample times (seconds)
    pub timestamps: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl AccelerationCapture {
    /// Build a capture, checking that the axes line up with the time base
    pub fn new(
        timestamps: Vec<f64>,
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
    ) -> Result<Self, TrajectoryError> {
        let capture = Self {
            timestamps,
            x,
            y,
            z,
        };
        capture.validate()?;
        Ok(capture)
    }

    /// Validate axis lengths and timestamp ordering
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        let n = self.timestamps.len();
        for axis in Axis::ALL {
            let len = self.axis_values(axis).len();
            if len != n {
                return Err(TrajectoryError::MalformedSeries(format!(
                    "axis {} has {} samples, expected {}",
                    axis.as_str(),
                    len,
                    n
                )));
            }
        }
        validate_timestamps(&self.timestamps)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn axis_values(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// One axis as a scalar signal
    pub fn axis(&self, axis: Axis) -> Result<ScalarSignal, TrajectoryError> {
        TimeSeries::new(self.timestamps.clone(), self.axis_values(axis).to_vec())
    }
}

/// One position fix (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat: f64,
    pub lon: f64,
}

impl PositionSample {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Euclidean distance in raw (lat, lon) degree space, no geodesic correction
    pub fn planar_distance(&self, other: &PositionSample) -> f64 {
        let dlat = other.lat - self.lat;
        let dlon = other.lon - self.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

/// Position fixes in capture order (insertion order is temporal order)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionSeries {
    samples: Vec<PositionSample>,
}

impl PositionSeries {
    pub fn new(samples: Vec<PositionSample>) -> Self {
        Self { samples }
    }

    /// Zip parallel latitude/longitude columns
    pub fn from_lat_lon(latitudes: &[f64], longitudes: &[f64]) -> Result<Self, TrajectoryError> {
        if latitudes.len() != longitudes.len() {
            return Err(TrajectoryError::MalformedSeries(format!(
                "{} latitudes but {} longitudes",
                latitudes.len(),
                longitudes.len()
            )));
        }
        Ok(Self::new(
            latitudes
                .iter()
                .zip(longitudes)
                .map(|(&lat, &lon)| PositionSample::new(lat, lon))
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[PositionSample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&PositionSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.samples.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    pub fn latitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.lat).collect()
    }

    pub fn longitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.lon).collect()
    }

    /// Copy of the series without its first `count` fixes
    pub fn without_leading(&self, count: usize) -> PositionSeries {
        let start = count.min(self.samples.len());
        Self::new(self.samples[start..].to_vec())
    }
}

/// Displacement at one instant (meters, relative to the first sample)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplacementVector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl DisplacementVector {
    pub fn magnitude(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy + self.dz * self.dz).sqrt()
    }
}

/// Per-step cumulative displacement on each axis
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementSeries {
    pub dx: ScalarSignal,
    pub dy: ScalarSignal,
    pub dz: ScalarSignal,
    /// Number of acceleration samples the estimate was built from
    pub sample_count: usize,
}

impl DisplacementSeries {
    pub fn axis(&self, axis: Axis) -> &ScalarSignal {
        match axis {
            Axis::X => &self.dx,
            Axis::Y => &self.dy,
            Axis::Z => &self.dz,
        }
    }

    /// Displacement at sample `index`, if in range
    pub fn at(&self, index: usize) -> Option<DisplacementVector> {
        Some(DisplacementVector {
            dx: *self.dx.values().get(index)?,
            dy: *self.dy.values().get(index)?,
            dz: *self.dz.values().get(index)?,
        })
    }

    /// Displacement at the last sample (zero vector for an empty series)
    pub fn final_displacement(&self) -> DisplacementVector {
        DisplacementVector {
            dx: self.dx.final_value(),
            dy: self.dy.final_value(),
            dz: self.dz.final_value(),
        }
    }
}

/// Effective sampling rate of a stream. A frequency of 0.0 means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingStats {
    pub frequency_hz: f64,
    pub sample_count: usize,
}

/// Outcome of stripping divergent leading fixes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub retained: PositionSeries,
    pub removed_count: usize,
}

/// Free-form device metadata from the capture export (property → value)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceInfo {
    properties: BTreeMap<String, String>,
}

impl DeviceInfo {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Everything the core computes for one capture
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryEstimate {
    pub displacement: DisplacementSeries,
    pub sampling: SamplingStats,
    pub divergence: DivergenceReport,
}

// ============================================================================
// Report payload
// ============================================================================

/// Producer metadata embedded in every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Full per-step displacement track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementTrack {
    pub timestamps: Vec<f64>,
    pub dx: Vec<f64>,
    pub dy: Vec<f64>,
    pub dz: Vec<f64>,
}

/// Displacement section of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplacementSummary {
    /// Displacement at the last sample (meters)
    #[serde(rename = "final")]
    pub final_m: DisplacementVector,
    /// Straight-line distance from the first sample (meters)
    pub magnitude_m: f64,
    /// Captured duration (seconds)
    pub duration_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<DisplacementTrack>,
}

/// Position section of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    pub retained_count: usize,
    pub removed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<PositionSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<PositionSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<PositionSeries>,
}

/// Conditions worth surfacing alongside the numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Sampling rate could not be determined (reported as 0.0)
    UnknownSamplingRate,
    /// Divergent leading position fixes were discarded
    LeadingFixesRemoved,
    /// Fewer than two position fixes remain, so there is no track
    NoPositionTrack,
}

/// Report document produced for one capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub sampling: SamplingStats,
    pub displacement: DisplacementSummary,
    pub positions: PositionSummary,
    #[serde(default)]
    pub flags: Vec<QualityFlag>,
    #[serde(default, skip_serializing_if = "DeviceInfo::is_empty")]
    pub device: DeviceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series_rejects_mismatched_lengths() {
        let result = TimeSeries::new(vec![0.0, 1.0], vec![1.0]);
        assert!(matches!(result, Err(TrajectoryError::MalformedSeries(_))));
    }

    #[test]
    fn test_time_series_rejects_duplicate_timestamps() {
        let result = TimeSeries::new(vec![0.0, 1.0, 1.0], vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(TrajectoryError::MalformedSeries(_))));

        let result = TimeSeries::new(vec![0.0, 2.0, 1.0], vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(TrajectoryError::MalformedSeries(_))));
    }

    #[test]
    fn test_time_series_rejects_nan_timestamp() {
        let result = TimeSeries::new(vec![0.0, f64::NAN], vec![1.0, 2.0]);
        assert!(matches!(result, Err(TrajectoryError::MalformedSeries(_))));
    }

    #[test]
    fn test_time_series_accessors() {
        let series = TimeSeries::new(vec![1.0, 1.5, 3.0], vec![10.0, 20.0, 30.0]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first(), Some((1.0, &10.0)));
        assert_eq!(series.last(), Some((3.0, &30.0)));
        assert!((series.duration() - 2.0).abs() < 1e-12);
        assert_eq!(series.final_value(), 30.0);

        let empty = ScalarSignal::new(vec![], vec![]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.duration(), 0.0);
        assert_eq!(empty.final_value(), 0.0);
    }

    #[test]
    fn test_acceleration_capture_axis_length_mismatch() {
        let result = AccelerationCapture::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0, 0.0],
        );
        assert!(matches!(result, Err(TrajectoryError::MalformedSeries(_))));
    }

    #[test]
    fn test_position_series_from_lat_lon() {
        let series = PositionSeries::from_lat_lon(&[1.0, 2.0], &[3.0, 4.0]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.latitudes(), vec![1.0, 2.0]);
        assert_eq!(series.longitudes(), vec![3.0, 4.0]);

        let mismatched = PositionSeries::from_lat_lon(&[1.0, 2.0], &[3.0]);
        assert!(matches!(mismatched, Err(TrajectoryError::MalformedSeries(_))));
    }

    #[test]
    fn test_position_series_without_leading() {
        let series = PositionSeries::from_lat_lon(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(series.without_leading(1).first(), Some(&PositionSample::new(2.0, 0.0)));
        assert!(series.without_leading(5).is_empty());
    }

    #[test]
    fn test_planar_distance() {
        let a = PositionSample::new(0.0, 0.0);
        let b = PositionSample::new(3.0, 4.0);
        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_position_series_serializes_as_array() {
        let series = PositionSeries::from_lat_lon(&[1.5], &[-2.5]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"[{"lat":1.5,"lon":-2.5}]"#);
    }
}
