//! The per-city pipeline: geocode, weather, air quality, attractions, advice.

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::{
    advisory::Advisory,
    config::Settings,
    error::TripError,
    fusion::{FusedForecast, fuse_air_quality, fuse_forecast},
    model::{AirQualityReading, Attraction, CityRequest, ForecastWindow, Location, TripResult},
    provider::Providers,
};

/// A city that could not be planned. The batch carries on without it.
#[derive(Debug)]
pub struct CityFailure {
    pub city: String,
    pub error: TripError,
}

#[derive(Debug)]
pub enum CityOutcome {
    Planned(TripResult),
    Failed(CityFailure),
}

/// Outcomes in input order, plus the number of cities needing a mask.
#[derive(Debug, Default)]
pub struct PlanReport {
    pub outcomes: Vec<CityOutcome>,
    pub masks_needed: usize,
}

impl PlanReport {
    pub fn results(&self) -> impl Iterator<Item = &TripResult> {
        self.outcomes.iter().filter_map(|o| match o {
            CityOutcome::Planned(result) => Some(result),
            CityOutcome::Failed(_) => None,
        })
    }

    pub fn into_results(self) -> Vec<TripResult> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                CityOutcome::Planned(result) => Some(result),
                CityOutcome::Failed(_) => None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct TripPlanner {
    providers: Providers,
    radius_km: f64,
    max_attractions: usize,
    today: NaiveDate,
}

impl TripPlanner {
    /// Planner using the batch radius from `settings`.
    pub fn new(providers: Providers, settings: &Settings, today: NaiveDate) -> Self {
        Self {
            providers,
            radius_km: settings.batch_radius_km,
            max_attractions: settings.max_attractions,
            today,
        }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Parse each token and plan it, in order. A bad token or a failed city
    /// becomes a [`CityFailure`]; later cities still run.
    pub async fn plan<S: AsRef<str>>(&self, tokens: &[S]) -> PlanReport {
        let mut report = PlanReport::default();

        for token in tokens {
            let token = token.as_ref();
            let outcome = match CityRequest::parse(token) {
                Ok(request) => self.plan_city(&request).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(result) => {
                    if result.mask {
                        report.masks_needed += 1;
                    }
                    report.outcomes.push(CityOutcome::Planned(result));
                }
                Err(error) => {
                    warn!(token, error = %error, "city failed");
                    let city = token.split(':').next().unwrap_or(token).trim().to_string();
                    report.outcomes.push(CityOutcome::Failed(CityFailure { city, error }));
                }
            }
        }

        report
    }

    #[instrument(skip(self), fields(city = %request.city))]
    pub async fn plan_city(&self, request: &CityRequest) -> Result<TripResult, TripError> {
        let location = self.locate(&request.city).await?;
        let forecast = self.forecast(&location, request.window(self.today)).await;
        let air = self.air_quality(&location).await;
        let attractions = self.attractions(&request.city, &location).await;

        info!(
            weather = %forecast.source,
            air = %air.source,
            attractions = attractions.len(),
            "city planned"
        );
        Ok(assemble(&request.city, location, attractions, forecast, air))
    }

    pub async fn locate(&self, city: &str) -> Result<Location, TripError> {
        self.providers.geocoder.geocode(city).await
    }

    pub async fn forecast(&self, location: &Location, window: ForecastWindow) -> FusedForecast {
        fuse_forecast(
            self.providers.primary_forecast.as_ref(),
            self.providers.secondary_forecast.as_deref(),
            location,
            window,
        )
        .await
    }

    pub async fn air_quality(&self, location: &Location) -> AirQualityReading {
        fuse_air_quality(
            self.providers.primary_air.as_ref(),
            self.providers.secondary_air.as_deref(),
            location,
        )
        .await
    }

    pub async fn attractions(&self, city: &str, location: &Location) -> Vec<Attraction> {
        self.providers
            .attractions
            .attractions(city, location, self.radius_km, self.max_attractions)
            .await
    }
}

/// Derive the advisories and build the final record for one city.
pub fn assemble(
    city: &str,
    location: Location,
    attractions: Vec<Attraction>,
    forecast: FusedForecast,
    air_quality: AirQualityReading,
) -> TripResult {
    let advisory = Advisory::derive(&forecast.daily, &air_quality);

    TripResult {
        city: city.to_string(),
        address: location.address,
        lat: location.lat,
        lng: location.lng,
        attractions,
        daily: forecast.daily,
        weather_source: forecast.source,
        air_quality,
        clothing: advisory.clothing,
        umbrella: advisory.umbrella,
        mask: advisory.mask,
        notes: advisory.notes,
    }
}
