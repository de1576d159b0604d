//! A WGS84 point and its `"lat,lng"` text form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeocodeError;

/// Latitude and longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Build a point, rejecting out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeocodeError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(GeocodeError::InvalidCoordinates(format!("{},{}", lat, lng)));
        }
        Ok(Self { lat, lng })
    }
}

/// Six decimals, the precision stored on records.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

impl FromStr for Coordinates {
    type Err = GeocodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeocodeError::InvalidCoordinates(s.to_string());
        let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
        Coordinates::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let point: Coordinates = "-1.2195, 36.8436".parse().unwrap();
        assert_eq!(point.lat, -1.2195);
        assert_eq!(point.to_string(), "-1.219500,36.843600");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("".parse::<Coordinates>().is_err());
        assert!("1.2".parse::<Coordinates>().is_err());
        assert!("abc,36.8".parse::<Coordinates>().is_err());
        assert!("91.0,36.8".parse::<Coordinates>().is_err());
        assert!("1.0,181.0".parse::<Coordinates>().is_err());
    }
}
