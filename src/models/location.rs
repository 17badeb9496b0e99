use serde::{Deserialize, Serialize};

pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A single geolocation fix as sent by a client and stored per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
}

impl LocationUpdate {
    /// Checks coordinate bounds. Returns the name of the first offending field.
    pub fn out_of_range_field(&self) -> Option<&'static str> {
        if !LATITUDE_RANGE.contains(&self.latitude) {
            return Some("latitude");
        }
        if !LONGITUDE_RANGE.contains(&self.longitude) {
            return Some("longitude");
        }
        None
    }
}
