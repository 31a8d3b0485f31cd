use super::{Geocoder, GEOCODE_LANGUAGE};
use crate::error::GeocodeError;
use crate::model::LatLng;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Geocodes through the review backend, which proxies Google and holds the key.
pub struct BackendGeocoder {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct GeocodeRequest<'a> {
    address: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    success: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl BackendGeocoder {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl Geocoder for BackendGeocoder {
    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&GeocodeRequest {
                address,
                language: GEOCODE_LANGUAGE,
            })
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GeocodeError::Rejected {
                status: resp.status().as_u16().to_string(),
                message: "backend geocode endpoint failed".into(),
            });
        }

        let body: GeocodeResponse = resp
            .json()
            .await
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        match (body.success, body.latitude, body.longitude) {
            (true, Some(lat), Some(lng)) => Ok(LatLng { lat, lng }),
            _ => {
                tracing::debug!(address, message = ?body.message, "backend could not geocode");
                Err(GeocodeError::NotFound {
                    address: address.to_string(),
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "backend"
    }
}
