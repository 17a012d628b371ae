use serde::{Deserialize, Serialize};

/// Geographic position in degrees and meters above the ellipsoid.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cartographic {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub height_m: f64,
}

impl Cartographic {
    pub fn new(lon_deg: f64, lat_deg: f64, height_m: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            height_m,
        }
    }

    /// Position on the ellipsoid surface.
    pub fn on_surface(lon_deg: f64, lat_deg: f64) -> Self {
        Self::new(lon_deg, lat_deg, 0.0)
    }

    /// `[lon, lat, height]`, the ordering streaming packets use.
    pub fn to_degrees_array(&self) -> [f64; 3] {
        [self.lon_deg, self.lat_deg, self.height_m]
    }

    /// Packet property form: `{"cartographicDegrees": [lon, lat, height]}`.
    pub fn to_packet_value(&self) -> serde_json::Value {
        serde_json::json!({ "cartographicDegrees": self.to_degrees_array() })
    }
}
