use crate::config::GeocoderConfig;
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Resolved place for a coordinate pair. Empty fields mean the provider
/// could not resolve them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

/// Reverse-geocoding seam; the HTTP layer depends on this, not on a vendor.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, latitude: &str, longitude: &str) -> Result<PlaceDetails>;
}

/// LocationIQ reverse geocoding client.
pub struct LocationIqGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl LocationIqGeocoder {
    /// The API key comes from `LOCATIONIQ_API_KEY`.
    pub fn from_env(config: &GeocoderConfig) -> Result<Self> {
        let api_key = std::env::var("LOCATIONIQ_API_KEY").map_err(|_| {
            TrackerError::Config("LOCATIONIQ_API_KEY environment variable not set".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: PlaceDetails,
}

#[async_trait]
impl Geocoder for LocationIqGeocoder {
    #[instrument(skip(self))]
    async fn reverse(&self, latitude: &str, longitude: &str) -> Result<PlaceDetails> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("lat", latitude),
                ("lon", longitude),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::Geocode(format!(
                "reverse lookup returned {}",
                response.status()
            )));
        }

        let body: ReverseResponse = response.json().await?;
        debug!(
            state = %body.address.state,
            country = %body.address.country,
            "Reverse geocoded coordinates"
        );
        Ok(body.address)
    }
}
