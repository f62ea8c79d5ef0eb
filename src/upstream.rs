use crate::config::UpstreamConfig;
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, instrument};

/// Raw provider snapshot: provider region identifier mapped to an
/// uninterpreted entry. Interpretation belongs to the normalizer.
pub type RawSnapshot = Map<String, Value>;

/// Source of country-wide case count snapshots.
#[async_trait]
pub trait CaseFeed: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<RawSnapshot>;
}

/// Client for the covid19india.org statistics feed.
pub struct Covid19IndiaFeed {
    client: reqwest::Client,
    url: String,
}

impl Covid19IndiaFeed {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl CaseFeed for Covid19IndiaFeed {
    #[instrument(skip(self))]
    async fn fetch_snapshot(&self) -> Result<RawSnapshot> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(TrackerError::Upstream(format!(
                "snapshot request returned {}",
                response.status()
            )));
        }

        let payload = response.bytes().await?;
        let body: Value = serde_json::from_slice(&payload)
            .map_err(|e| TrackerError::UpstreamFormat(format!("snapshot is not JSON: {e}")))?;
        let snapshot = match body {
            Value::Object(map) => map,
            _ => {
                return Err(TrackerError::UpstreamFormat(
                    "snapshot root is not a JSON object".to_string(),
                ))
            }
        };

        info!("Fetched snapshot with {} region entries", snapshot.len());
        Ok(snapshot)
    }
}
