use async_trait::async_trait;

use crate::{
    agent::{ToolInvocation, summarize},
    error::TripError,
    model::{AirQualityReading, Attraction, DataSource, DayForecast, ForecastWindow, Location},
};

use super::{AirQualityProvider, AttractionProvider, ForecastProvider, Geocoder, Narrator};

const KNOWN_CITIES: [(&str, f64, f64); 3] = [
    ("paris", 48.8566, 2.3522),
    ("tokyo", 35.6895, 139.6917),
    ("new york", 40.7128, -74.0060),
];

pub const MOCK_AQI: f64 = 40.0;

/// Deterministic stand-in for every provider; never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

#[async_trait]
impl Geocoder for MockProvider {
    async fn geocode(&self, query: &str) -> Result<Location, TripError> {
        let key = query.trim().to_lowercase();
        let (lat, lng) = KNOWN_CITIES
            .iter()
            .find(|(name, _, _)| *name == key)
            .map_or((0.0, 0.0), |(_, lat, lng)| (*lat, *lng));

        Ok(Location { lat, lng, address: format!("{query}, Example Address") })
    }
}

#[async_trait]
impl ForecastProvider for MockProvider {
    fn source(&self) -> DataSource {
        DataSource::Mock
    }

    /// Day `i` of the window is `{high: 20+i, low: 12+i, precip: 10}`.
    async fn daily_forecast(&self, _: &Location, window: ForecastWindow) -> Vec<DayForecast> {
        (0..window.horizon())
            .map(|j| {
                let i = j.saturating_sub(window.offset) as f64;
                DayForecast::new(Some(20.0 + i), Some(12.0 + i), 10)
            })
            .collect()
    }
}

#[async_trait]
impl AirQualityProvider for MockProvider {
    fn source(&self) -> DataSource {
        DataSource::Mock
    }

    async fn air_quality(&self, _: &Location) -> Option<AirQualityReading> {
        Some(AirQualityReading::classified(Some(MOCK_AQI), DataSource::Mock))
    }
}

#[async_trait]
impl AttractionProvider for MockProvider {
    async fn attractions(
        &self,
        city: &str,
        _: &Location,
        _: f64,
        max_results: usize,
    ) -> Vec<Attraction> {
        let mut places = vec![
            Attraction {
                name: format!("{city} Main Museum"),
                address: format!("123 Main St, {city}"),
                distance_km: 0.6,
                kind: "museum".to_string(),
            },
            Attraction {
                name: format!("{city} Old Town"),
                address: format!("45 Old Town Rd, {city}"),
                distance_km: 1.0,
                kind: "historic".to_string(),
            },
        ];
        places.truncate(max_results);
        places
    }
}

#[async_trait]
impl Narrator for MockProvider {
    async fn narrate(&self, city: &str, transcript: &[ToolInvocation]) -> anyhow::Result<String> {
        Ok(summarize(city, transcript))
    }
}
