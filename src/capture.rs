//! Capture loading
//!
//! Decodes stored phone-sensor exports into typed, parallel sample vectors. All
//! field validation happens here, at the load boundary: missing columns,
//! unparsable or non-finite cells, empty captures and out-of-order timestamps are
//! rejected before any numeric stage runs.
//!
//! An export directory contains:
//! - an acceleration table (`Accelerometer.csv` or a linear-acceleration variant)
//!   with a time column and three axis columns
//! - `Location.csv` with latitude and longitude columns
//! - optionally `meta/device.csv` with `property,value` rows
//!
//! Columns are matched on the header text before the unit, case-insensitively,
//! so `"Latitude (°)"` and `"latitude"` both match `latitude`.

use crate::error::TrajectoryError;
use crate::types::{AccelerationCapture, DeviceInfo, PositionSeries};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Acceleration table names, in order of preference
pub const ACCELERATION_FILES: &[&str] = &[
    "Accelerometer.csv",
    "Linear Accelerometer.csv",
    "Linear Acceleration.csv",
];

/// Position table name
pub const LOCATION_FILE: &str = "Location.csv";

/// Device metadata table, relative to the export directory
pub const DEVICE_FILE: &str = "meta/device.csv";

const TIME_COLUMNS: &[&str] = &["time"];
const X_COLUMNS: &[&str] = &["x", "acceleration x", "linear acceleration x", "accel x"];
const Y_COLUMNS: &[&str] = &["y", "acceleration y", "linear acceleration y", "accel y"];
const Z_COLUMNS: &[&str] = &["z", "acceleration z", "linear acceleration z", "accel z"];
const LATITUDE_COLUMNS: &[&str] = &["latitude", "lat"];
const LONGITUDE_COLUMNS: &[&str] = &["longitude", "lon", "lng"];

/// Both sensor streams of one capture session, plus device metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SensorCapture {
    pub acceleration: AccelerationCapture,
    pub positions: PositionSeries,
    pub device: DeviceInfo,
    /// Directory the capture was loaded from, if any
    pub source: Option<PathBuf>,
}

/// Loader for stored capture files
pub struct CaptureLoader;

impl CaptureLoader {
    /// Load a full capture from an export directory
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<SensorCapture, TrajectoryError> {
        let dir = dir.as_ref();

        let accel_path = Self::find_acceleration_file(dir)?;
        let acceleration = Self::read_acceleration_csv(&fs::read_to_string(&accel_path)?)?;

        let location_path = dir.join(LOCATION_FILE);
        if !location_path.is_file() {
            return Err(TrajectoryError::ParseError(format!(
                "no {} in {}",
                LOCATION_FILE,
                dir.display()
            )));
        }
        let positions = Self::read_positions_csv(&fs::read_to_string(&location_path)?)?;

        let device_path = dir.join(DEVICE_FILE);
        let device = if device_path.is_file() {
            Self::read_device_csv(&fs::read_to_string(&device_path)?)?
        } else {
            debug!("no device metadata at {}", device_path.display());
            DeviceInfo::default()
        };

        info!(
            "loaded capture {}: {} acceleration samples, {} position fixes",
            dir.display(),
            acceleration.len(),
            positions.len()
        );

        Ok(SensorCapture {
            acceleration,
            positions,
            device,
            source: Some(dir.to_path_buf()),
        })
    }

    /// First acceleration table present in `dir`
    pub fn find_acceleration_file(dir: &Path) -> Result<PathBuf, TrajectoryError> {
        ACCELERATION_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                TrajectoryError::ParseError(format!(
                    "no acceleration table ({}) in {}",
                    ACCELERATION_FILES.join(", "),
                    dir.display()
                ))
            })
    }

    /// Decode an acceleration table (time, x, y, z)
    pub fn read_acceleration_csv(content: &str) -> Result<AccelerationCapture, TrajectoryError> {
        let table = Table::parse(content)?;
        let time = table.column(TIME_COLUMNS, "time")?;
        let x = table.column(X_COLUMNS, "acceleration x")?;
        let y = table.column(Y_COLUMNS, "acceleration y")?;
        let z = table.column(Z_COLUMNS, "acceleration z")?;

        if table.rows.is_empty() {
            return Err(TrajectoryError::insufficient(1, 0));
        }

        AccelerationCapture::new(
            table.floats(time)?,
            table.floats(x)?,
            table.floats(y)?,
            table.floats(z)?,
        )
    }

    /// Decode a position table (latitude, longitude)
    pub fn read_positions_csv(content: &str) -> Result<PositionSeries, TrajectoryError> {
        let table = Table::parse(content)?;
        let lat = table.column(LATITUDE_COLUMNS, "latitude")?;
        let lon = table.column(LONGITUDE_COLUMNS, "longitude")?;

        if table.rows.is_empty() {
            return Err(TrajectoryError::insufficient(1, 0));
        }

        PositionSeries::from_lat_lon(&table.floats(lat)?, &table.floats(lon)?)
    }

    /// Decode `property,value` device metadata rows
    pub fn read_device_csv(content: &str) -> Result<DeviceInfo, TrajectoryError> {
        let table = Table::parse(content)?;
        let key_col = table.column(&["property"], "property")?;
        let value_col = table.column(&["value"], "value")?;

        let properties: BTreeMap<String, String> = table
            .rows
            .iter()
            .filter_map(|row| {
                let key = row.get(key_col)?.trim();
                if key.is_empty() {
                    return None;
                }
                let value = row.get(value_col).map(|v| v.trim()).unwrap_or_default();
                Some((key.to_string(), value.to_string()))
            })
            .collect();

        Ok(DeviceInfo::new(properties))
    }

    /// Decode an acceleration capture from JSON (`{timestamps, x, y, z}`)
    pub fn acceleration_from_json(json: &str) -> Result<AccelerationCapture, TrajectoryError> {
        let capture: AccelerationCapture = serde_json::from_str(json)?;
        if capture.is_empty() {
            return Err(TrajectoryError::insufficient(1, 0));
        }
        capture.validate()?;
        if let Some(axis) = crate::types::Axis::ALL
            .into_iter()
            .find(|axis| capture.axis_values(*axis).iter().any(|v| !v.is_finite()))
        {
            return Err(TrajectoryError::ParseError(format!(
                "non-finite value on axis {}",
                axis.as_str()
            )));
        }
        Ok(capture)
    }

    /// Decode a position series from JSON (`[{lat, lon}, ...]`)
    pub fn positions_from_json(json: &str) -> Result<PositionSeries, TrajectoryError> {
        let positions: PositionSeries = serde_json::from_str(json)?;
        if positions.is_empty() {
            return Err(TrajectoryError::insufficient(1, 0));
        }
        if positions
            .iter()
            .any(|p| !(p.lat.is_finite() && p.lon.is_finite()))
        {
            return Err(TrajectoryError::ParseError(
                "non-finite position fix".to_string(),
            ));
        }
        Ok(positions)
    }
}

/// Raw string table with normalized headers
struct Table {
    headers: Vec<String>,
    normalized: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    fn parse(content: &str) -> Result<Self, TrajectoryError> {
        let delimiter = detect_delimiter(content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let normalized = headers.iter().map(|h| normalize_header(h)).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(record);
        }

        Ok(Self {
            headers,
            normalized,
            rows,
        })
    }

    /// Index of the first header matching any alias
    fn column(&self, aliases: &[&str], label: &str) -> Result<usize, TrajectoryError> {
        aliases
            .iter()
            .find_map(|alias| self.normalized.iter().position(|h| h == alias))
            .ok_or_else(|| {
                TrajectoryError::MissingColumn(format!(
                    "{} (headers: {})",
                    label,
                    self.headers.join(", ")
                ))
            })
    }

    /// Parse one column as finite floats; row numbers in errors are 1-based data rows
    fn floats(&self, column: usize) -> Result<Vec<f64>, TrajectoryError> {
        let name = &self.headers[column];
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cell = row.get(column).unwrap_or_default();
                match cell.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    _ => Err(TrajectoryError::ParseError(format!(
                        "row {}, column '{}': invalid number '{}'",
                        i + 1,
                        name,
                        cell
                    ))),
                }
            })
            .collect()
    }
}

/// Header text before any unit suffix, lowercased
fn normalize_header(header: &str) -> String {
    let name = header.split('(').next().unwrap_or(header);
    name.trim().trim_matches('"').trim().to_lowercase()
}

/// Pick the delimiter that splits the header line into the most fields
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|d| header.matches(*d as char).count())
        .filter(|d| header.contains(*d as char))
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionSample;
    use pretty_assertions::assert_eq;

    const ACCEL_CSV: &str = "\"Time (s)\",\"X (m/s^2)\",\"Y (m/s^2)\",\"Z (m/s^2)\"\n\
        0.000,0.10,0.20,9.81\n\
        0.010,0.11,0.19,9.80\n\
        0.020,0.12,0.21,9.82\n";

    const LOCATION_CSV: &str = "\"Time (s)\",\"Latitude (°)\",\"Longitude (°)\",\"Height (m)\"\n\
        0.0,-23.5505,-46.6333,760.0\n\
        1.0,-23.5506,-46.6334,760.5\n";

    fn temp_capture_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trajecto-capture-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(dir.join("meta")).unwrap();
        dir
    }

    #[test]
    fn test_read_acceleration_csv() {
        let capture = CaptureLoader::read_acceleration_csv(ACCEL_CSV).unwrap();
        assert_eq!(capture.timestamps, vec![0.0, 0.01, 0.02]);
        assert_eq!(capture.x, vec![0.10, 0.11, 0.12]);
        assert_eq!(capture.z, vec![9.81, 9.80, 9.82]);
    }

    #[test]
    fn test_read_acceleration_long_header_names() {
        let csv = "Time (s);Acceleration x (m/s^2);Acceleration y (m/s^2);Acceleration z (m/s^2);Absolute acceleration (m/s^2)\n\
            0;1;2;3;3.7\n\
            0.5;1;2;3;3.7\n";
        let capture = CaptureLoader::read_acceleration_csv(csv).unwrap();
        assert_eq!(capture.len(), 2);
        assert_eq!(capture.y, vec![2.0, 2.0]);
    }

    #[test]
    fn test_read_positions_csv() {
        let positions = CaptureLoader::read_positions_csv(LOCATION_CSV).unwrap();
        assert_eq!(
            positions.samples(),
            &[
                PositionSample::new(-23.5505, -46.6333),
                PositionSample::new(-23.5506, -46.6334),
            ]
        );
    }

    #[test]
    fn test_missing_column() {
        let csv = "Time (s),X (m/s^2),Y (m/s^2)\n0,1,2\n";
        let result = CaptureLoader::read_acceleration_csv(csv);
        assert!(matches!(result, Err(TrajectoryError::MissingColumn(_))));
    }

    #[test]
    fn test_unparsable_cell_reports_row() {
        let csv = "Time (s),X (m/s^2),Y (m/s^2),Z (m/s^2)\n0,1,2,3\n0.1,abc,2,3\n";
        match CaptureLoader::read_acceleration_csv(csv) {
            Err(TrajectoryError::ParseError(msg)) => {
                assert!(msg.contains("row 2"));
                assert!(msg.contains("abc"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_cell_rejected() {
        let csv = "Latitude (°),Longitude (°)\nNaN,1.0\n";
        let result = CaptureLoader::read_positions_csv(csv);
        assert!(matches!(result, Err(TrajectoryError::ParseError(_))));
    }

    #[test]
    fn test_empty_capture_is_insufficient() {
        let csv = "Time (s),X (m/s^2),Y (m/s^2),Z (m/s^2)\n";
        let result = CaptureLoader::read_acceleration_csv(csv);
        assert!(matches!(
            result,
            Err(TrajectoryError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn test_non_monotonic_time_is_malformed() {
        let csv = "Time (s),X (m/s^2),Y (m/s^2),Z (m/s^2)\n0,1,2,3\n0.2,1,2,3\n0.1,1,2,3\n";
        let result = CaptureLoader::read_acceleration_csv(csv);
        assert!(matches!(result, Err(TrajectoryError::MalformedSeries(_))));
    }

    #[test]
    fn test_read_device_csv() {
        let csv = "\"property\",\"value\"\n\"deviceModel\",\"Pixel 7\"\n\"deviceRelease\",\"14\"\n";
        let device = CaptureLoader::read_device_csv(csv).unwrap();
        assert_eq!(device.get("deviceModel"), Some("Pixel 7"));
        assert_eq!(device.get("deviceRelease"), Some("14"));
        assert_eq!(device.get("missing"), None);
    }

    #[test]
    fn test_load_dir() {
        let dir = temp_capture_dir();
        fs::write(dir.join("Accelerometer.csv"), ACCEL_CSV).unwrap();
        fs::write(dir.join(LOCATION_FILE), LOCATION_CSV).unwrap();
        fs::write(dir.join(DEVICE_FILE), "property,value\ndeviceModel,Pixel 7\n").unwrap();

        let capture = CaptureLoader::load_dir(&dir).unwrap();
        assert_eq!(capture.acceleration.len(), 3);
        assert_eq!(capture.positions.len(), 2);
        assert_eq!(capture.device.get("deviceModel"), Some("Pixel 7"));
        assert_eq!(capture.source.as_deref(), Some(dir.as_path()));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_dir_without_metadata() {
        let dir = temp_capture_dir();
        fs::write(dir.join("Linear Acceleration.csv"), ACCEL_CSV).unwrap();
        fs::write(dir.join(LOCATION_FILE), LOCATION_CSV).unwrap();

        let capture = CaptureLoader::load_dir(&dir).unwrap();
        assert!(capture.device.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_dir_missing_tables() {
        let dir = temp_capture_dir();
        assert!(CaptureLoader::load_dir(&dir).is_err());

        fs::write(dir.join("Accelerometer.csv"), ACCEL_CSV).unwrap();
        assert!(CaptureLoader::load_dir(&dir).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_json_inputs() {
        let accel = CaptureLoader::acceleration_from_json(
            r#"{"timestamps":[0.0,0.1],"x":[1.0,1.0],"y":[0.0,0.0],"z":[9.8,9.8]}"#,
        )
        .unwrap();
        assert_eq!(accel.len(), 2);

        let positions =
            CaptureLoader::positions_from_json(r#"[{"lat":1.0,"lon":2.0},{"lat":1.1,"lon":2.1}]"#)
                .unwrap();
        assert_eq!(positions.len(), 2);

        assert!(CaptureLoader::positions_from_json("[]").is_err());
        assert!(CaptureLoader::acceleration_from_json(
            r#"{"timestamps":[0.0,0.1],"x":[1.0],"y":[0.0,0.0],"z":[9.8,9.8]}"#
        )
        .is_err());
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("\"Latitude (°)\""), "latitude");
        assert_eq!(normalize_header("Time (s)"), "time");
        assert_eq!(normalize_header("  X  "), "x");
    }
}
