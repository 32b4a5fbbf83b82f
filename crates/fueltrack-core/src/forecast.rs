//! Open-Meteo daily forecast client.
//!
//! # Example
//!
//! ```no_run
//! use fueltrack_core::{ForecastConfig, ForecastProvider, OpenMeteoClient};
//!
//! # async fn example() -> Result<(), fueltrack_core::Error> {
//! let client = OpenMeteoClient::new(ForecastConfig::default())?;
//! let forecast = client.fetch_forecast().await?;
//! println!("{:.1} HDD/day over the next week", forecast.avg_hdd_per_day);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::debug;

use fueltrack_types::{date::iso_date, parse_date};

use crate::calc::{self, DEFAULT_HDD_BASE_TEMP, round_to};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::traits::ForecastProvider;

/// Where and how to fetch the forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub url: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone the daily buckets are computed in.
    pub timezone: String,
    /// Display name for the location.
    pub location_name: String,
    pub forecast_days: u8,
    pub base_temp: f64,
    pub timeout: Duration,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            url: "https://api.open-meteo.com/v1/forecast".to_string(),
            latitude: 60.009,
            longitude: -111.883,
            timezone: "America/Yellowknife".to_string(),
            location_name: "Fort Smith, NWT".to_string(),
            forecast_days: 7,
            base_temp: DEFAULT_HDD_BASE_TEMP,
            timeout: Duration::from_secs(15),
        }
    }
}

/// One forecast day, rounded to a tenth of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastDay {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub max_temp: f64,
    pub min_temp: f64,
    pub mean_temp: f64,
    pub hdd: f64,
}

/// A fetched forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub days: Vec<ForecastDay>,
    pub total_hdd: f64,
    pub avg_hdd_per_day: f64,
}

impl Forecast {
    /// HDD by day index, for the refill predictor.
    pub fn hdd_series(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.hdd).collect()
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    daily: OpenMeteoDaily,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

/// Decode an Open-Meteo daily response.
///
/// Days with a missing high or low are dropped. A response without any
/// complete day is an error, since no average can be formed.
pub fn parse_open_meteo(
    body: &str,
    config: &ForecastConfig,
    fetched_at: OffsetDateTime,
) -> Result<Forecast> {
    let response: OpenMeteoResponse = serde_json::from_str(body)?;
    let daily = response.daily;

    let mut days = Vec::with_capacity(daily.time.len());
    for (i, date) in daily.time.iter().enumerate() {
        let max = daily.temperature_2m_max.get(i).copied().flatten();
        let min = daily.temperature_2m_min.get(i).copied().flatten();
        let (Some(max), Some(min)) = (max, min) else {
            debug!("forecast day {} has no temperature range, skipping", date);
            continue;
        };
        let mean = calc::mean_temp(min, max);
        days.push(ForecastDay {
            date: parse_date(date)?,
            max_temp: round_to(max, 1),
            min_temp: round_to(min, 1),
            mean_temp: round_to(mean, 1),
            hdd: round_to(calc::hdd(mean, config.base_temp), 1),
        });
    }

    if days.is_empty() {
        return Err(Error::invalid_data("forecast contains no complete days"));
    }

    let total: f64 = days.iter().map(|d| d.hdd).sum();
    Ok(Forecast {
        location: config.location_name.clone(),
        fetched_at,
        total_hdd: round_to(total, 1),
        avg_hdd_per_day: round_to(total / days.len() as f64, 1),
        days,
    })
}

/// HTTP client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    config: ForecastConfig,
    retry: RetryConfig,
}

impl OpenMeteoClient {
    /// Create a client with the configured request timeout.
    pub fn new(config: ForecastConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client around an existing reqwest client.
    pub fn with_client(client: Client, config: ForecastConfig) -> Self {
        Self {
            client,
            config,
            retry: RetryConfig::for_fetch(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    async fn fetch_once(&self) -> Result<Forecast> {
        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("latitude", self.config.latitude.to_string()),
                ("longitude", self.config.longitude.to_string()),
                ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
                ("timezone", self.config.timezone.clone()),
                ("forecast_days", self.config.forecast_days.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(status.as_u16(), response.url().as_str()));
        }
        let body = response.text().await?;
        parse_open_meteo(&body, &self.config, OffsetDateTime::now_utc())
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    async fn fetch_forecast(&self) -> Result<Forecast> {
        with_retry(&self.retry, "fetch_forecast", || self.fetch_once()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    const SAMPLE: &str = r#"{
        "latitude": 60.0,
        "longitude": -111.875,
        "timezone": "America/Yellowknife",
        "daily_units": {"time": "iso8601", "temperature_2m_max": "°C", "temperature_2m_min": "°C"},
        "daily": {
            "time": ["2025-01-15", "2025-01-16", "2025-01-17"],
            "temperature_2m_max": [-12.34, -8.0, null],
            "temperature_2m_min": [-25.66, -20.0, -30.0]
        }
    }"#;

    #[test]
    fn test_parse_open_meteo() {
        let fetched_at = datetime!(2025-01-15 12:00 UTC);
        let forecast = parse_open_meteo(SAMPLE, &ForecastConfig::default(), fetched_at).unwrap();

        assert_eq!(forecast.location, "Fort Smith, NWT");
        assert_eq!(forecast.days.len(), 2);

        let first = forecast.days[0];
        assert_eq!(first.date, date!(2025 - 01 - 15));
        assert_eq!(first.max_temp, -12.3);
        assert_eq!(first.min_temp, -25.7);
        assert_eq!(first.mean_temp, -19.0);
        assert_eq!(first.hdd, 37.0);

        assert_eq!(forecast.days[1].hdd, 32.0);
        assert_eq!(forecast.total_hdd, 69.0);
        assert_eq!(forecast.avg_hdd_per_day, 34.5);
        assert_eq!(forecast.hdd_series(), vec![37.0, 32.0]);
    }

    #[test]
    fn test_parse_empty_forecast_is_error() {
        let body = r#"{"daily": {"time": [], "temperature_2m_max": [], "temperature_2m_min": []}}"#;
        let err = parse_open_meteo(body, &ForecastConfig::default(), OffsetDateTime::UNIX_EPOCH).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_parse_garbage_is_json_error() {
        let err = parse_open_meteo("<html>", &ForecastConfig::default(), OffsetDateTime::UNIX_EPOCH).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
