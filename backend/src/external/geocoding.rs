//! Forward geocoding: resolve a place name to coordinates.
//! Uses the OpenWeatherMap direct geocoding API with the same key as history.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::Coordinates;

use crate::config::WeatherConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("location not found: {0}")]
    NotFound(String),

    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geocoding API error: {status} - {body}")]
    Status { status: u16, body: String },
}

/// A place name resolved to coordinates
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedLocation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub coordinates: Coordinates,
}

/// Resolves caller-supplied location names before an accumulation starts
pub trait Geocoder: Send + Sync {
    fn resolve(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<ResolvedLocation, GeocodeError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OWMGeocodeItem {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
}

/// OpenWeatherMap direct geocoding client
#[derive(Clone)]
pub struct GeocodingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.geocoding_endpoint.clone(),
        })
    }

    /// Create a new GeocodingClient with custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Look up the best match for `location`
    pub async fn lookup(&self, location: &str) -> Result<ResolvedLocation, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", location), ("limit", "1"), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Status { status, body });
        }

        let matches: Vec<OWMGeocodeItem> = response.json().await?;
        let best = matches
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(location.to_string()))?;

        tracing::debug!(
            "Geocoded {} to {} ({}, {})",
            location,
            best.name,
            best.lat,
            best.lon
        );

        Ok(ResolvedLocation {
            name: best.name,
            country: best.country,
            coordinates: Coordinates::new(best.lat, best.lon),
        })
    }
}

impl Geocoder for GeocodingClient {
    async fn resolve(&self, location: &str) -> Result<ResolvedLocation, GeocodeError> {
        self.lookup(location).await
    }
}
