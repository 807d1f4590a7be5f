//! Weather API client for fetching hourly temperature history
//!
//! Integrates with the OpenWeatherMap history API. One request covers one UTC
//! calendar day.

use std::future::Future;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use shared::{Coordinates, DailyObservations, TemperatureSample};

use crate::config::WeatherConfig;

const SECONDS_PER_DAY: i64 = 86_400;

/// Fractional digits kept from provider temperatures
const TEMPERATURE_SCALE: u32 = 2;

/// Why a day's observations could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("malformed weather response: {0}")]
    Malformed(String),
}

/// Source of one calendar day's raw temperature samples.
///
/// Implementations return samples whose timestamps fall on `date` (UTC).
pub trait WeatherSource: Send + Sync {
    fn fetch_day(
        &self,
        coordinates: Coordinates,
        date: NaiveDate,
    ) -> impl Future<Output = Result<DailyObservations, FetchError>> + Send;
}

/// OpenWeatherMap history API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    history_url: String,
}

/// OpenWeatherMap history API response
#[derive(Debug, Deserialize)]
struct OWMHistoryResponse {
    list: Vec<OWMHistoryItem>,
}

#[derive(Debug, Deserialize)]
struct OWMHistoryItem {
    dt: i64,
    main: OWMMain,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

impl WeatherClient {
    /// Create a new WeatherClient from configuration
    pub fn new(config: &WeatherConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            history_url: config.history_endpoint.clone(),
        })
    }

    /// Create a new WeatherClient with custom history URL (for testing)
    pub fn with_base_url(api_key: String, history_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            history_url,
        }
    }

    /// Fetch hourly observations for one UTC calendar day
    pub async fn get_hourly_history(
        &self,
        coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<DailyObservations, FetchError> {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).timestamp();
        let end = start + SECONDS_PER_DAY;

        let response = self
            .client
            .get(&self.history_url)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("type", "hour".to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let data: OWMHistoryResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        convert_history_response(date, data)
    }
}

impl WeatherSource for WeatherClient {
    async fn fetch_day(
        &self,
        coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<DailyObservations, FetchError> {
        self.get_hourly_history(coordinates, date).await
    }
}

/// Convert an OpenWeatherMap history response to the day's samples, dropping
/// readings stamped outside `date`
fn convert_history_response(
    date: NaiveDate,
    data: OWMHistoryResponse,
) -> Result<DailyObservations, FetchError> {
    let mut samples = Vec::with_capacity(data.list.len());

    for item in data.list {
        let timestamp = DateTime::from_timestamp(item.dt, 0)
            .ok_or_else(|| FetchError::Malformed(format!("invalid timestamp {}", item.dt)))?;
        if timestamp.date_naive() != date {
            continue;
        }

        samples.push(TemperatureSample {
            timestamp,
            temperature_celsius: to_decimal(item.main.temp)?,
            temp_min_celsius: to_decimal(item.main.temp_min)?,
            temp_max_celsius: to_decimal(item.main.temp_max)?,
        });
    }

    Ok(DailyObservations::new(date, samples))
}

fn to_decimal(value: f64) -> Result<Decimal, FetchError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(TEMPERATURE_SCALE))
        .ok_or_else(|| FetchError::Malformed(format!("temperature {} is not finite", value)))
}
