//! Report encoding
//!
//! This module encodes a trajectory estimate into the JSON report consumed by
//! presenters. Final values are always present; full per-step series are
//! included only on request.

use crate::error::TrajectoryError;
use crate::types::{
    DeviceInfo, DisplacementSummary, DisplacementTrack, PositionSummary, QualityFlag,
    ReportProducer, TrajectoryEstimate, TrajectoryReport,
};
use crate::{PRODUCER_NAME, TRAJECTO_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for trajectory reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an estimate into a report
    pub fn encode(
        &self,
        estimate: &TrajectoryEstimate,
        device: &DeviceInfo,
        full_series: bool,
    ) -> Result<TrajectoryReport, TrajectoryError> {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: TRAJECTO_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let displacement = self.build_displacement(estimate, full_series)?;
        let positions = self.build_positions(estimate, full_series);
        let flags = self.build_flags(estimate);

        Ok(TrajectoryReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            computed_at_utc: Utc::now().to_rfc3339(),
            sampling: estimate.sampling,
            displacement,
            positions,
            flags,
            device: device.clone(),
        })
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        estimate: &TrajectoryEstimate,
        device: &DeviceInfo,
        full_series: bool,
    ) -> Result<String, TrajectoryError> {
        let report = self.encode(estimate, device, full_series)?;
        serde_json::to_string_pretty(&report).map_err(TrajectoryError::JsonError)
    }

    fn build_displacement(
        &self,
        estimate: &TrajectoryEstimate,
        full_series: bool,
    ) -> Result<DisplacementSummary, TrajectoryError> {
        let displacement = &estimate.displacement;
        let final_m = displacement.final_displacement();
        let magnitude_m = final_m.magnitude();

        if !magnitude_m.is_finite() {
            return Err(TrajectoryError::EncodingError(
                "displacement is not finite".to_string(),
            ));
        }

        let series = full_series.then(|| DisplacementTrack {
            timestamps: displacement.dx.timestamps().to_vec(),
            dx: displacement.dx.values().to_vec(),
            dy: displacement.dy.values().to_vec(),
            dz: displacement.dz.values().to_vec(),
        });

        Ok(DisplacementSummary {
            final_m,
            magnitude_m,
            duration_sec: displacement.dx.duration(),
            series,
        })
    }

    fn build_positions(&self, estimate: &TrajectoryEstimate, full_series: bool) -> PositionSummary {
        let retained = &estimate.divergence.retained;

        PositionSummary {
            retained_count: retained.len(),
            removed_count: estimate.divergence.removed_count,
            start: retained.first().copied(),
            end: retained.last().copied(),
            track: full_series.then(|| retained.clone()),
        }
    }

    fn build_flags(&self, estimate: &TrajectoryEstimate) -> Vec<QualityFlag> {
        let mut flags = Vec::new();

        if estimate.sampling.frequency_hz == 0.0 {
            flags.push(QualityFlag::UnknownSamplingRate);
        }
        if estimate.divergence.removed_count > 0 {
            flags.push(QualityFlag::LeadingFixesRemoved);
        }
        if estimate.divergence.retained.len() < 2 {
            flags.push(QualityFlag::NoPositionTrack);
        }

        flags
    }
}
