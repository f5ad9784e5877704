use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    fusion::estimate_from_index,
    model::{AirQualityReading, DataSource, DayForecast, ForecastWindow, Location},
};

use super::{AirQualityProvider, ForecastProvider, fetch_json};

/// OpenWeatherMap, the optional secondary source for weather and air quality.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, http: Client, base_url: String) -> Self {
        Self { api_key, http, base_url }
    }

    async fn fetch_daily(&self, location: &Location) -> Result<Vec<OneCallDay>> {
        let request = self
            .http
            .get(format!("{}/data/2.5/onecall", self.base_url))
            .query(&[
                ("lat", location.lat.to_string().as_str()),
                ("lon", location.lng.to_string().as_str()),
                ("exclude", "current,minutely,hourly,alerts"),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ]);

        let value = fetch_json(request, "OpenWeather forecast").await?;
        let parsed: OwForecastResponse = serde_json::from_value(value)
            .map_err(|err| anyhow!("Failed to parse OpenWeather forecast JSON: {err}"))?;

        Ok(parsed.daily)
    }

    async fn fetch_index(&self, location: &Location) -> Result<i64> {
        let request = self
            .http
            .get(format!("{}/data/2.5/air_pollution", self.base_url))
            .query(&[
                ("lat", location.lat.to_string().as_str()),
                ("lon", location.lng.to_string().as_str()),
                ("appid", self.api_key.as_str()),
            ]);

        let value = fetch_json(request, "OpenWeather air pollution").await?;
        let parsed: OwAirPollutionResponse = serde_json::from_value(value)
            .map_err(|err| anyhow!("Failed to parse OpenWeather air pollution JSON: {err}"))?;

        parsed
            .list
            .first()
            .map(|entry| entry.main.aqi)
            .ok_or_else(|| anyhow!("OpenWeather air pollution response contained no data"))
    }
}

/// One entry of a One Call `daily` array. Also used by the Google adapter,
/// which sometimes answers in this layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct OneCallDay {
    temp: Option<OwTemp>,
    pop: Option<f64>,
}

impl OneCallDay {
    pub(crate) fn to_day(&self) -> DayForecast {
        let temp = self.temp.as_ref();
        // `pop` is a 0..1 probability, truncated to a whole percent.
        let precip = self.pop.map(|p| (p * 100.0).clamp(0.0, 100.0) as u8).unwrap_or(0);
        DayForecast::new(temp.and_then(|t| t.max), temp.and_then(|t| t.min), precip)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwTemp {
    max: Option<f64>,
    min: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    daily: Vec<OneCallDay>,
}

#[derive(Debug, Deserialize)]
struct OwAirMain {
    aqi: i64,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAirMain,
}

#[derive(Debug, Deserialize)]
struct OwAirPollutionResponse {
    #[serde(default)]
    list: Vec<OwAirEntry>,
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    fn source(&self) -> DataSource {
        DataSource::Secondary
    }

    #[instrument(skip(self), level = "debug")]
    async fn daily_forecast(
        &self,
        location: &Location,
        window: ForecastWindow,
    ) -> Vec<DayForecast> {
        match self.fetch_daily(location).await {
            Ok(days) => {
                debug!(days = days.len(), "OpenWeather forecast received");
                days.iter().take(window.horizon()).map(OneCallDay::to_day).collect()
            }
            Err(err) => {
                warn!("{err:#}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl AirQualityProvider for OpenWeatherProvider {
    fn source(&self) -> DataSource {
        DataSource::Secondary
    }

    #[instrument(skip(self), level = "debug")]
    async fn air_quality(&self, location: &Location) -> Option<AirQualityReading> {
        match self.fetch_index(location).await {
            Ok(index) => {
                let reading = estimate_from_index(index);
                if reading.is_none() {
                    warn!(index, "OpenWeather returned an AQI index outside 1..=5");
                }
                reading
            }
            Err(err) => {
                warn!("{err:#}");
                None
            }
        }
    }
}
