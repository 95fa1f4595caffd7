//! One GPS fix.

use crate::geo::LatLon;

/// A single position fix from whatever GPS source is driving the engine.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Course over ground in degrees, 0 = north.
    pub heading_deg: f64,
    /// Ground speed in metres per second.
    pub speed_mps: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64, heading_deg: f64, speed_mps: f64) -> Self {
        Self { lat, lon, heading_deg, speed_mps }
    }
}

impl LatLon for Position {
    #[inline]
    fn lat(&self) -> f64 {
        self.lat
    }
    #[inline]
    fn lon(&self) -> f64 {
        self.lon
    }
}
