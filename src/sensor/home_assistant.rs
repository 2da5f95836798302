//! Kitchen thermostat reading through the Home Assistant state API

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use super::{ReadingFuture, SensorError, TemperatureSource};
use crate::config::SensorConfig;

/// `GET /api/states/<entity>` response; only the state matters
#[derive(Debug, Deserialize)]
struct StateResponse {
    state: String,
}

/// Reads a temperature sensor entity from Home Assistant
///
/// The entity is expected to report °F already.
pub struct HomeAssistantSensor {
    base_url: String,
    token: String,
    entity_id: String,
    client: reqwest::Client,
}

impl HomeAssistantSensor {
    /// Build a client whose requests give up after `timeout`
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        entity_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SensorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            entity_id: entity_id.into(),
            client,
        })
    }

    /// Build from configuration; `None` when the integration is not configured
    pub fn from_config(config: &SensorConfig) -> Result<Option<Self>, SensorError> {
        match (&config.base_url, &config.token, &config.entity_id) {
            (Some(url), Some(token), Some(entity)) => {
                Self::new(url.as_str(), token.as_str(), entity.as_str(), config.timeout).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn state_url(&self) -> String {
        format!("{}/api/states/{}", self.base_url, self.entity_id)
    }

    async fn fetch(&self) -> Result<f64, SensorError> {
        let response = self
            .client
            .get(self.state_url())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SensorError::Status(status.as_u16()));
        }

        let body: StateResponse = response.json().await?;
        body.state
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|temp| temp.is_finite())
            .ok_or(SensorError::Unparseable(body.state))
    }
}

impl TemperatureSource for HomeAssistantSensor {
    fn is_enabled(&self) -> bool {
        true
    }

    fn fahrenheit(&self) -> ReadingFuture<'_> {
        Box::pin(self.fetch())
    }
}
