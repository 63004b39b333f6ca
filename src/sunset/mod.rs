use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::GeoLocation;

const SUNRISE_SUNSET_URL: &str = "https://api.sunrisesunset.io/json";

/// One day of the provider's answer. Times are `HH:MM:SS` strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SunsetDay {
    pub date: String,
    pub sunset: String,
}

#[derive(Debug, Deserialize)]
struct WindowResponse {
    #[serde(default)]
    results: Vec<SunsetDay>,
}

#[async_trait]
pub trait SunsetProvider: Send + Sync {
    /// Sunset times for every day in `start..=end`, in one request.
    async fn sunset_window(
        &self,
        location: GeoLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<SunsetDay>>;
}

pub struct SunriseSunsetClient {
    client: Client,
    base_url: String,
}

impl SunriseSunsetClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: SUNRISE_SUNSET_URL.to_string(),
        }
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SunsetProvider for SunriseSunsetClient {
    async fn sunset_window(
        &self,
        location: GeoLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<SunsetDay>> {
        let params = [
            ("lat", format!("{:.6}", location.latitude)),
            ("lng", format!("{:.6}", location.longitude)),
            ("date_start", start.format("%Y-%m-%d").to_string()),
            ("date_end", end.format("%Y-%m-%d").to_string()),
            ("time_format", "24".to_string()),
        ];
        let url = Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| AppError::Config(format!("invalid sunset URL: {}", e)))?;

        debug!("fetching sunsets {} to {}", start, end);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api {
                service: "Sunset",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: WindowResponse = response
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("sunset window: {}", e)))?;
        Ok(body.results)
    }
}
