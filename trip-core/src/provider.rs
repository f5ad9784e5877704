use crate::{
    Config,
    agent::ToolInvocation,
    error::TripError,
    model::{AirQualityReading, Attraction, DataSource, DayForecast, ForecastWindow, Location},
    provider::{
        google::GoogleClient, mock::MockProvider, openai::OpenAiNarrator,
        openweather::OpenWeatherProvider,
    },
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod google;
pub mod mock;
pub mod openai;
pub mod openweather;

const USER_AGENT: &str = concat!("trip-planner/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// Geocoding, weather, air quality and places.
    Google,
    /// Optional secondary weather and air quality.
    OpenWeather,
    /// Language model used to narrate agent runs.
    OpenAi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Google => "google",
            ProviderId::OpenWeather => "openweather",
            ProviderId::OpenAi => "openai",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::Google => "GOOGLE_MAPS_API_KEY",
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Google, ProviderId::OpenWeather, ProviderId::OpenAi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "google" => Ok(ProviderId::Google),
            "openweather" => Ok(ProviderId::OpenWeather),
            "openai" => Ok(ProviderId::OpenAi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: google, openweather, openai."
            )),
        }
    }
}

/// Free-text place name to coordinates. The only adapter whose failure is fatal.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn geocode(&self, query: &str) -> Result<Location, TripError>;
}

/// Daily forecast series starting today. An empty series means "no data".
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    fn source(&self) -> DataSource;

    async fn daily_forecast(&self, location: &Location, window: ForecastWindow)
    -> Vec<DayForecast>;
}

/// Current air quality. `None` means the provider had nothing usable.
#[async_trait]
pub trait AirQualityProvider: Send + Sync + Debug {
    fn source(&self) -> DataSource;

    async fn air_quality(&self, location: &Location) -> Option<AirQualityReading>;
}

/// Attractions near a location, nearest first. Empty means "no data".
#[async_trait]
pub trait AttractionProvider: Send + Sync + Debug {
    async fn attractions(
        &self,
        city: &str,
        location: &Location,
        radius_km: f64,
        max_results: usize,
    ) -> Vec<Attraction>;
}

/// Turns an agent transcript into prose for the user.
#[async_trait]
pub trait Narrator: Send + Sync + Debug {
    async fn narrate(&self, city: &str, transcript: &[ToolInvocation]) -> anyhow::Result<String>;
}

/// One implementation per capability, injected into the planner.
#[derive(Debug)]
pub struct Providers {
    pub geocoder: Box<dyn Geocoder>,
    pub primary_forecast: Box<dyn ForecastProvider>,
    pub secondary_forecast: Option<Box<dyn ForecastProvider>>,
    pub primary_air: Box<dyn AirQualityProvider>,
    pub secondary_air: Option<Box<dyn AirQualityProvider>>,
    pub attractions: Box<dyn AttractionProvider>,
}

impl Providers {
    /// Google for everything, plus OpenWeather when its key is configured.
    pub fn live(config: &Config) -> Result<Self, TripError> {
        let http = http_client(config)?;
        let endpoints = &config.settings.endpoints;
        let google = GoogleClient::new(
            config.primary_api_key()?.to_owned(),
            http.clone(),
            endpoints.clone(),
        );

        let secondary = config.provider_api_key(ProviderId::OpenWeather).map(|key| {
            OpenWeatherProvider::new(key.to_owned(), http.clone(), endpoints.openweather.clone())
        });

        Ok(Self {
            geocoder: Box::new(google.clone()),
            primary_forecast: Box::new(google.clone()),
            secondary_forecast: secondary
                .clone()
                .map(|p| Box::new(p) as Box<dyn ForecastProvider>),
            primary_air: Box::new(google.clone()),
            secondary_air: secondary.map(|p| Box::new(p) as Box<dyn AirQualityProvider>),
            attractions: Box::new(google),
        })
    }

    /// Deterministic fixtures, no network access.
    pub fn mock() -> Self {
        Self {
            geocoder: Box::new(MockProvider),
            primary_forecast: Box::new(MockProvider),
            secondary_forecast: None,
            primary_air: Box::new(MockProvider),
            secondary_air: None,
            attractions: Box::new(MockProvider),
        }
    }
}

/// Narrator backed by the language model, or the deterministic one in mock mode.
pub fn narrator_from_config(config: &Config, mock: bool) -> Result<Box<dyn Narrator>, TripError> {
    if mock {
        return Ok(Box::new(MockProvider));
    }

    let narrator = OpenAiNarrator::new(
        config.llm_api_key()?.to_owned(),
        http_client(config)?,
        config.settings.endpoints.openai.clone(),
    );
    Ok(Box::new(narrator))
}

/// HTTP client shared by the adapters; every request gets the same timeout.
pub fn http_client(config: &Config) -> Result<Client, TripError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.settings.timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Percent value from a JSON number, clamped to 0..=100.
pub(crate) fn percent_from_value(value: &serde_json::Value) -> u8 {
    value
        .as_f64()
        .map(|p| p.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Send a request and parse the body as JSON, failing on non-2xx statuses.
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
    what: &str,
) -> anyhow::Result<serde_json::Value> {
    use anyhow::Context;

    let res = request
        .send()
        .await
        .with_context(|| format!("Failed to send {what} request"))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {what} response body"))?;

    if !status.is_success() {
        return Err(anyhow::anyhow!(
            "{what} request failed with status {}: {}",
            status,
            truncate_body(&body),
        ));
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse {what} JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn live_providers_error_when_missing_primary_key() {
        let cfg = Config::default();
        let err = Providers::live(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider 'google'"));
    }

    #[test]
    fn secondary_is_wired_only_when_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Google, "KEY".to_string());

        let providers = Providers::live(&cfg).unwrap();
        assert!(providers.secondary_forecast.is_none());
        assert!(providers.secondary_air.is_none());

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OWM".to_string());
        let providers = Providers::live(&cfg).unwrap();
        assert_eq!(
            providers.secondary_forecast.as_ref().map(|p| p.source()),
            Some(DataSource::Secondary)
        );
        assert_eq!(providers.primary_forecast.source(), DataSource::Primary);
    }

    #[test]
    fn narrator_requires_llm_key_outside_mock_mode() {
        let cfg = Config::default();
        assert!(narrator_from_config(&cfg, true).is_ok());

        let err = narrator_from_config(&cfg, false).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn percent_from_value_rounds_and_clamps() {
        assert_eq!(percent_from_value(&serde_json::json!(39.6)), 40);
        assert_eq!(percent_from_value(&serde_json::json!(140)), 100);
        assert_eq!(percent_from_value(&serde_json::json!("high")), 0);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }
}
