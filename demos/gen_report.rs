//! Generate a trajectory report for a synthetic capture

use trajecto::displacement::constant_acceleration_capture;
use trajecto::{estimate_trajectory, PipelineConfig, PositionSample, PositionSeries, ReportEncoder};

fn main() {
    // 0.5 m/s² forward for 4 s at 50 Hz
    let acceleration = match constant_acceleration_capture([0.5, 0.0, 0.0], 50.0, 4.0) {
        Ok(capture) => capture,
        Err(e) => {
            eprintln!("Error: {e:?}");
            return;
        }
    };

    // Walk north with two cold-start fixes far to the east
    let mut fixes: Vec<PositionSample> = (0..20)
        .map(|i| PositionSample::new(-23.5505 + i as f64 * 0.00001, -46.6333))
        .collect();
    fixes[0].lon += 0.02;
    fixes[1].lon += 0.01;
    let positions = PositionSeries::new(fixes);

    let config = PipelineConfig::default();
    let report = estimate_trajectory(&acceleration, &positions, &config).and_then(|estimate| {
        ReportEncoder::new().encode_to_json(&estimate, &Default::default(), config.full_series)
    });

    match report {
        Ok(json) => print!("{json}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
