//! Geocoding collaborators used to place map markers.

mod backend;
mod google;

pub use backend::BackendGeocoder;
pub use google::GoogleGeocoder;

use crate::config::AppConfig;
use crate::error::GeocodeError;
use crate::model::LatLng;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub const GEOCODE_LANGUAGE: &str = "zh-TW";

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text address to a position.
    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GeocoderKind {
    /// The review backend's `/api/v1/maps/geocode` endpoint.
    Backend,
    /// Google Geocoding API directly (needs an API key).
    Google,
    /// No geocoding; map view stays empty.
    None,
}

/// Per-process cache in front of another geocoder. Only successes are cached.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<HashMap<String, LatLng>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, address: &str) -> Option<LatLng> {
        self.cache
            .lock()
            .ok()
            .and_then(|c| c.get(address).copied())
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
        if let Some(hit) = self.cached(address) {
            debug!(address, "geocode cache hit");
            return Ok(hit);
        }
        let pos = self.inner.geocode(address).await?;
        if let Ok(mut c) = self.cache.lock() {
            c.insert(address.to_string(), pos);
        }
        Ok(pos)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Build the configured geocoder, or `None` when geocoding is disabled or lacks a key.
pub fn build_geocoder(
    kind: GeocoderKind,
    cfg: &AppConfig,
    http: reqwest::Client,
    google_key: Option<String>,
) -> Option<Arc<dyn Geocoder>> {
    match kind {
        GeocoderKind::None => None,
        GeocoderKind::Backend => Some(Arc::new(CachedGeocoder::new(BackendGeocoder::new(
            http,
            cfg.geocode_url(),
        )))),
        GeocoderKind::Google => {
            let key = google_key.filter(|k| !k.trim().is_empty())?;
            Some(Arc::new(CachedGeocoder::new(GoogleGeocoder::new(http, key))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for Counting {
        async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if address == "nowhere" {
                return Err(GeocodeError::NotFound {
                    address: address.into(),
                });
            }
            Ok(LatLng { lat: 23.0, lng: 120.2 })
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn cache_serves_repeats_but_not_failures() {
        let g = CachedGeocoder::new(Counting {
            calls: AtomicUsize::new(0),
        });
        g.geocode("台南市").await.unwrap();
        g.geocode("台南市").await.unwrap();
        assert!(g.geocode("nowhere").await.is_err());
        assert!(g.geocode("nowhere").await.is_err());
        assert_eq!(g.inner.calls.load(Ordering::SeqCst), 3);
    }
}
