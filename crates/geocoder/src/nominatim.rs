//! Geocoding against the OpenStreetMap Nominatim API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::coordinates::Coordinates;
use crate::error::{GeocodeError, Result};
use crate::{Geocoder, Place};

/// Public Nominatim endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// User agent sent with every request, as Nominatim's usage policy requires.
pub const USER_AGENT: &str = "FiberInstallationApp/1.0";

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    road: Option<String>,
    pedestrian: Option<String>,
    footway: Option<String>,
    path: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    village: Option<String>,
    town: Option<String>,
    city: Option<String>,
}

impl Address {
    fn road(&self) -> Option<String> {
        first_present([&self.road, &self.pedestrian, &self.footway, &self.path])
    }

    fn area(&self) -> Option<String> {
        first_present([
            &self.suburb,
            &self.neighbourhood,
            &self.village,
            &self.town,
            &self.city,
        ])
    }
}

fn first_present<const N: usize>(candidates: [&Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Nominatim HTTP client.
///
/// Every failure (network, status, body shape) is logged and reported as
/// "no result"; a pin without a road name is still a usable location.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Client for the public endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client for a self-hosted instance.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Geocoding request: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Response(e.to_string()))
    }

    /// Reverse lookup with errors surfaced.
    pub async fn try_reverse(&self, at: Coordinates) -> Result<Option<Place>> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}&addressdetails=1",
            self.base_url, at.lat, at.lng
        );
        let response: ReverseResponse = self.get_json(&url).await?;
        let address = match response.address {
            Some(address) => address,
            None => return Ok(None),
        };

        Ok(Some(Place {
            coordinates: at,
            road: address.road(),
            area: address.area(),
            display_name: response.display_name.unwrap_or_default(),
        }))
    }

    /// Forward lookup with errors surfaced. Takes the first hit.
    pub async fn try_search(&self, text: &str) -> Result<Option<Coordinates>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let url = format!(
            "{}/search?format=json&limit=1&q={}",
            self.base_url,
            urlencoding::encode(text)
        );
        let hits: Vec<SearchHit> = self.get_json(&url).await?;
        let hit = match hits.into_iter().next() {
            Some(hit) => hit,
            None => return Ok(None),
        };

        let lat = hit
            .lat
            .parse()
            .map_err(|_| GeocodeError::Response(format!("bad latitude: {}", hit.lat)))?;
        let lng = hit
            .lon
            .parse()
            .map_err(|_| GeocodeError::Response(format!("bad longitude: {}", hit.lon)))?;
        Coordinates::new(lat, lng).map(Some)
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, at: Coordinates) -> Option<Place> {
        match self.try_reverse(at).await {
            Ok(place) => place,
            Err(e) => {
                warn!(coordinates = %at, error = %e, "Reverse geocoding failed");
                None
            }
        }
    }

    async fn search(&self, text: &str) -> Option<Coordinates> {
        match self.try_search(text).await {
            Ok(found) => found,
            Err(e) => {
                warn!(query = %text, error = %e, "Location search failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_road_fallback_order() {
        let address: Address = serde_json::from_str(
            r#"{"footway": "Ngong Walk", "path": "Back Path", "suburb": "Kilimani"}"#,
        )
        .unwrap();
        assert_eq!(address.road().as_deref(), Some("Ngong Walk"));
        assert_eq!(address.area().as_deref(), Some("Kilimani"));

        let address: Address = serde_json::from_str(r#"{"road": " ", "city": "Nairobi"}"#).unwrap();
        assert_eq!(address.road(), None);
        assert_eq!(address.area().as_deref(), Some("Nairobi"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let geocoder = NominatimGeocoder::with_base_url("http://localhost:8080/");
        assert_eq!(geocoder.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_empty_search_skips_request() {
        // Unroutable base URL: any request would fail.
        let geocoder = NominatimGeocoder::with_base_url("http://127.0.0.1:9");
        assert_eq!(geocoder.try_search("   ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_network_failure_degrades_to_none() {
        let geocoder = NominatimGeocoder::with_base_url("http://127.0.0.1:9");
        let at = Coordinates::new(-1.2195, 36.8436).unwrap();
        assert_eq!(geocoder.reverse(at).await, None);
        assert_eq!(geocoder.search("Kiambu Road").await, None);
    }

    // Integration tests that require network access
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_reverse_nairobi() {
        let geocoder = NominatimGeocoder::new();
        let at = Coordinates::new(-1.2864, 36.8172).unwrap();
        let place = geocoder.try_reverse(at).await.unwrap().unwrap();
        assert!(!place.display_name.is_empty());
    }
}
