use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::location::Coordinate;
use crate::weather::snapshot::WeatherReading;

/// Errors from one weather lookup. Always recoverable: the sampler logs
/// and skips the tick, the next tick retries from scratch.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Weather response malformed: {0}")]
    Malformed(String),
}

/// One-shot weather lookup keyed by coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn observe(&self, coordinate: Coordinate) -> Result<WeatherReading, ProviderError>;
}

/// OpenWeatherMap current-weather client. Requests metric units; every
/// response field the reading needs is validated before a reading exists.
pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Wire shape of the current-weather endpoint, reduced to the fields used.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    name: String,
    dt: i64,
    main: MainSection,
    weather: Vec<ConditionSection>,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionSection {
    main: String,
}

impl OpenWeatherMap {
    pub fn new(base_url: String, api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn observe(&self, coordinate: Coordinate) -> Result<WeatherReading, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let condition = parsed
            .weather
            .first()
            .ok_or_else(|| ProviderError::Malformed("empty weather condition list".to_string()))?;
        let observed_at = DateTime::from_timestamp(parsed.dt, 0)
            .ok_or_else(|| ProviderError::Malformed(format!("timestamp {} out of range", parsed.dt)))?;

        Ok(WeatherReading {
            place: parsed.name,
            temperature_celsius: parsed.main.temp,
            condition: condition.main.clone(),
            observed_at,
        })
    }
}
