//! Geocoding for FieldTrack record locations.
//!
//! Turning a map pin into a road name (and a typed place into a pin) is a
//! convenience: any failure degrades to `None` and the coordinates alone
//! remain usable.
//!
//! # Example
//!
//! ```no_run
//! use geocoder::{Coordinates, Geocoder, NominatimGeocoder};
//!
//! # async fn example() {
//! let geocoder = NominatimGeocoder::new();
//! let pin: Coordinates = "-1.2195,36.8436".parse().unwrap();
//! if let Some(place) = geocoder.reverse(pin).await {
//!     println!("{:?}", place.road);
//! }
//! # }
//! ```

pub mod coordinates;
pub mod error;
pub mod nominatim;

use async_trait::async_trait;
use serde::Serialize;

pub use coordinates::Coordinates;
pub use error::{GeocodeError, Result};
pub use nominatim::NominatimGeocoder;

/// A resolved location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub coordinates: Coordinates,
    /// Road, pedestrian way, footway or path, whichever is known first.
    pub road: Option<String>,
    /// Suburb, neighbourhood, village, town or city.
    pub area: Option<String>,
    pub display_name: String,
}

/// Best-effort geocoding lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Describe the place at `at`, if known.
    async fn reverse(&self, at: Coordinates) -> Option<Place>;

    /// Find the point best matching free text.
    async fn search(&self, text: &str) -> Option<Coordinates>;
}
