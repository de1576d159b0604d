//! Error types for geocoding lookups.

use thiserror::Error;

/// Errors that can occur while resolving a location.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Text is not a `lat,lng` pair within range.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("geocoding service returned {status}")]
    Status { status: u16 },

    /// Response body was not in the expected shape.
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Result type for geocoding operations.
pub type Result<T> = std::result::Result<T, GeocodeError>;
