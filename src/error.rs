//! Error types for the store, the configuration bootstrap and the geocoders.
//!
//! None of these are fatal: callers recover from a `FetchError` with an empty store
//! and from a `GeocodeError` by leaving out a single marker.

use thiserror::Error;

/// Loading the application list failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or transport failure before a response arrived.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not JSON.
    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A single address could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("address not found: {address}")]
    NotFound { address: String },

    /// Geocoding service rejected the request (quota, key, invalid request).
    #[error("geocoder status {status}: {message}")]
    Rejected { status: String, message: String },

    #[error("geocoder transport error: {0}")]
    Transport(String),

    #[error("geocoder returned an unreadable response: {0}")]
    Decode(String),
}

/// Fetching `/api/v1/config/frontend` failed; the caller falls back to defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("config endpoint returned HTTP {0}")]
    Status(u16),

    #[error("config endpoint returned no api_base_url")]
    MissingBaseUrl,
}
