//! Map rendering
//!
//! Renders a position track as a standalone Leaflet HTML page: the map is
//! centered on the first fix, the track is drawn as a polyline and every fix
//! gets a numbered marker ("Point 1", "Point 2", ...).

use crate::config::MapConfig;
use crate::error::TrajectoryError;
use crate::types::PositionSeries;
use serde_json::json;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

/// Renderer for track map pages
pub struct MapRenderer;

impl MapRenderer {
    /// Render a track to a standalone HTML page
    pub fn render_html(
        track: &PositionSeries,
        config: &MapConfig,
    ) -> Result<String, TrajectoryError> {
        let center = track.first().ok_or_else(|| {
            TrajectoryError::EncodingError("cannot render a map without position fixes".to_string())
        })?;

        let coords: Vec<[f64; 2]> = track.iter().map(|p| [p.lat, p.lon]).collect();
        let markers: Vec<serde_json::Value> = if config.show_markers {
            coords
                .iter()
                .enumerate()
                .map(|(i, c)| json!({ "at": c, "label": format!("Point {}", i + 1) }))
                .collect()
        } else {
            Vec::new()
        };

        let options = json!({
            "center": [center.lat, center.lon],
            "zoom": config.zoom_start,
            "line": {
                "color": config.line_color,
                "weight": config.line_weight,
            },
        });

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>Trajectory</title>
<link rel="stylesheet" href="{css}" />
<script src="{js}"></script>
<style>html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const options = {options};
const coords = {coords};
const markers = {markers};
const map = L.map("map").setView(options.center, options.zoom);
L.tileLayer("{tiles}", {{ maxZoom: 22, attribution: "{attribution}" }}).addTo(map);
L.polyline(coords, options.line).addTo(map);
for (const m of markers) {{
  L.marker(m.at).bindPopup(m.label).addTo(map);
}}
</script>
</body>
</html>
"#,
            css = LEAFLET_CSS,
            js = LEAFLET_JS,
            tiles = TILE_URL,
            attribution = TILE_ATTRIBUTION,
            options = options,
            coords = serde_json::to_string(&coords)?,
            markers = serde_json::to_string(&markers)?,
        ))
    }

    /// Render and write a map page to `path`
    pub fn write_html<P: AsRef<std::path::Path>>(
        track: &PositionSeries,
        config: &MapConfig,
        path: P,
    ) -> Result<(), TrajectoryError> {
        let html = Self::render_html(track, config)?;
        std::fs::write(path, html)?;
        Ok(())
    }
}
