use super::{Geocoder, GEOCODE_LANGUAGE};
use crate::error::GeocodeError;
use crate::model::LatLng;
use async_trait::async_trait;
use serde::Deserialize;

pub const GOOGLE_MAPS_API: &str = "https://maps.googleapis.com/maps/api";

pub struct GoogleGeocoder {
    http: reqwest::Client,
    base_url: String,
    key: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(http: reqwest::Client, key: String) -> Self {
        Self::with_base_url(http, GOOGLE_MAPS_API, key)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>, key: String) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
        let url = format!("{}/geocode/json", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("address", address),
                ("key", self.key.as_str()),
                ("language", GEOCODE_LANGUAGE),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        let body: GeocodeResponse = resp
            .json()
            .await
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        match body.status.as_str() {
            "OK" => body
                .results
                .into_iter()
                .next()
                .map(|r| LatLng {
                    lat: r.geometry.location.lat,
                    lng: r.geometry.location.lng,
                })
                .ok_or_else(|| GeocodeError::NotFound {
                    address: address.to_string(),
                }),
            "ZERO_RESULTS" => Err(GeocodeError::NotFound {
                address: address.to_string(),
            }),
            other => Err(GeocodeError::Rejected {
                status: other.to_string(),
                message: body.error_message.unwrap_or_default(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
