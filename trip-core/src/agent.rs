//! Agent mode: the planner pipeline run as an explicit list of tool calls.
//!
//! Every call is recorded in a transcript which a [`Narrator`] turns into a
//! readable plan. The order of calls never depends on the narrator.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::{
    advisory,
    config::Settings,
    error::TripError,
    fusion::FusedForecast,
    model::{AirQualityReading, Attraction, CityRequest, Location, TripResult},
    planner::{TripPlanner, assemble},
    provider::{Narrator, Providers},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCall {
    LocationCoordinates,
    WeatherForecast,
    AirQuality,
    TouristAttractions,
    ClothingAdvice,
    UmbrellaCheck,
    MaskCheck,
}

impl ToolCall {
    /// The calls made for every city, in order.
    pub const PLAN: [ToolCall; 7] = [
        ToolCall::LocationCoordinates,
        ToolCall::WeatherForecast,
        ToolCall::AirQuality,
        ToolCall::TouristAttractions,
        ToolCall::ClothingAdvice,
        ToolCall::UmbrellaCheck,
        ToolCall::MaskCheck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::LocationCoordinates => "get_location_coordinates",
            ToolCall::WeatherForecast => "get_weather_forecast",
            ToolCall::AirQuality => "get_air_quality_data",
            ToolCall::TouristAttractions => "get_tourist_attractions",
            ToolCall::ClothingAdvice => "get_clothing_advice",
            ToolCall::UmbrellaCheck => "check_umbrella_needed",
            ToolCall::MaskCheck => "check_mask_needed",
        }
    }
}

/// One recorded tool call and what it returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub output: Value,
}

#[derive(Debug)]
pub struct AgentReport {
    pub city: String,
    pub transcript: Vec<ToolInvocation>,
    pub narrative: String,
    pub result: TripResult,
}

/// What the tool calls have gathered so far for one city.
#[derive(Debug, Default)]
struct PlanState {
    location: Option<Location>,
    forecast: Option<FusedForecast>,
    air: Option<AirQualityReading>,
    attractions: Option<Vec<Attraction>>,
}

impl PlanState {
    fn location(&self) -> Result<&Location, TripError> {
        self.location.as_ref().ok_or_else(|| missing("location"))
    }

    fn forecast(&self) -> Result<&FusedForecast, TripError> {
        self.forecast.as_ref().ok_or_else(|| missing("weather forecast"))
    }

    fn air(&self) -> Result<&AirQualityReading, TripError> {
        self.air.as_ref().ok_or_else(|| missing("air quality"))
    }

    fn finish(self, city: &str) -> Result<TripResult, TripError> {
        match (self.location, self.forecast, self.air, self.attractions) {
            (Some(location), Some(forecast), Some(air), Some(attractions)) => {
                Ok(assemble(city, location, attractions, forecast, air))
            }
            _ => Err(missing("tool results")),
        }
    }
}

fn missing(what: &str) -> TripError {
    TripError::invalid_input(format!("{what} requested before it was gathered"))
}

#[derive(Debug)]
pub struct TripAgent {
    planner: TripPlanner,
    narrator: Box<dyn Narrator>,
}

impl TripAgent {
    /// Agent using the agent radius from `settings`.
    pub fn new(
        providers: Providers,
        narrator: Box<dyn Narrator>,
        settings: &Settings,
        today: NaiveDate,
    ) -> Self {
        let planner =
            TripPlanner::new(providers, settings, today).with_radius(settings.agent_radius_km);
        Self { planner, narrator }
    }

    /// Run the plan for one city token (`City`, `City:YYYY-MM-DD` or
    /// `City:YYYY-MM-DD:YYYY-MM-DD`).
    #[instrument(skip(self))]
    pub async fn run(&self, token: &str) -> Result<AgentReport, TripError> {
        let request = CityRequest::parse(token)?;
        let mut state = PlanState::default();
        let mut transcript = Vec::with_capacity(ToolCall::PLAN.len());

        for call in ToolCall::PLAN {
            let output = self.invoke(call, &request, &mut state).await?;
            info!(tool = call.name(), "tool invoked");
            debug!(tool = call.name(), %output, "tool output");
            transcript.push(ToolInvocation { tool: call.name().to_string(), output });
        }

        let narrative = match self.narrator.narrate(&request.city, &transcript).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "narration failed, using plain summary");
                summarize(&request.city, &transcript)
            }
        };

        Ok(AgentReport {
            result: state.finish(&request.city)?,
            city: request.city,
            transcript,
            narrative,
        })
    }

    async fn invoke(
        &self,
        call: ToolCall,
        request: &CityRequest,
        state: &mut PlanState,
    ) -> Result<Value, TripError> {
        let output = match call {
            ToolCall::LocationCoordinates => {
                let location = self.planner.locate(&request.city).await?;
                let output = serde_json::to_value(&location)?;
                state.location = Some(location);
                output
            }
            ToolCall::WeatherForecast => {
                let window = request.window(self.planner.today());
                let forecast = self.planner.forecast(state.location()?, window).await;
                let output = json!({ "source": forecast.source, "daily": forecast.daily });
                state.forecast = Some(forecast);
                output
            }
            ToolCall::AirQuality => {
                let air = self.planner.air_quality(state.location()?).await;
                let output = serde_json::to_value(&air)?;
                state.air = Some(air);
                output
            }
            ToolCall::TouristAttractions => {
                let places = self.planner.attractions(&request.city, state.location()?).await;
                let output = json!({ "radius_km": self.planner.radius_km(), "places": places });
                state.attractions = Some(places);
                output
            }
            ToolCall::ClothingAdvice => {
                let daily = &state.forecast()?.daily;
                json!({
                    "average_high_c": daily.average_high(),
                    "advice": advisory::clothing(daily),
                })
            }
            ToolCall::UmbrellaCheck => {
                let daily = &state.forecast()?.daily;
                json!({
                    "max_precip_percent": daily.max_precip(),
                    "umbrella_needed": advisory::umbrella(daily),
                })
            }
            ToolCall::MaskCheck => {
                let air = state.air()?;
                json!({ "aqi": air.aqi, "mask_needed": advisory::mask(air) })
            }
        };
        Ok(output)
    }
}

static NULL: Value = Value::Null;

/// Plain-text plan built only from the transcript.
pub fn summarize(city: &str, transcript: &[ToolInvocation]) -> String {
    let output = |call: ToolCall| {
        transcript
            .iter()
            .find(|t| t.tool == call.name())
            .map(|t| &t.output)
            .unwrap_or(&NULL)
    };
    let yes_no = |v: &Value| if v.as_bool().unwrap_or(false) { "yes" } else { "no" };

    let mut out = format!("Travel plan for {city}\n");

    let location = output(ToolCall::LocationCoordinates);
    if let Some(address) = location["address"].as_str() {
        let _ = writeln!(out, "Location: {address}");
    }

    let weather = output(ToolCall::WeatherForecast);
    let _ = writeln!(out, "Weather (source: {}):", weather["source"].as_str().unwrap_or("none"));
    for (i, day) in weather["daily"].as_array().into_iter().flatten().enumerate() {
        let temp = |key: &str| day[key].as_f64().map_or("N/A".to_string(), |t| format!("{t:.1}°C"));
        let _ = writeln!(
            out,
            "  Day {}: high {}, low {}, precipitation {}%",
            i + 1,
            temp("high"),
            temp("low"),
            day["precip"].as_u64().unwrap_or(0)
        );
    }

    let air = output(ToolCall::AirQuality);
    let aqi = air["aqi"].as_f64().map_or("N/A".to_string(), |a| format!("{a:.0}"));
    let _ = writeln!(
        out,
        "Air quality: AQI {aqi} ({})",
        air["category"].as_str().unwrap_or("Unknown")
    );

    let attractions = output(ToolCall::TouristAttractions);
    let places = attractions["places"].as_array().map(Vec::as_slice).unwrap_or_default();
    if places.is_empty() {
        out.push_str("Attractions: none found\n");
    } else {
        out.push_str("Attractions:\n");
        for place in places {
            let _ = writeln!(
                out,
                "  - {} ({:.2} km)",
                place["name"].as_str().unwrap_or("?"),
                place["distance_km"].as_f64().unwrap_or(0.0)
            );
        }
    }

    let clothing = output(ToolCall::ClothingAdvice);
    let _ = writeln!(
        out,
        "Clothing: {}",
        clothing["advice"].as_str().unwrap_or(advisory::NO_WEATHER_CLOTHING)
    );
    let _ = writeln!(out, "Umbrella: {}", yes_no(&output(ToolCall::UmbrellaCheck)["umbrella_needed"]));
    let _ = write!(out, "Mask: {}", yes_no(&output(ToolCall::MaskCheck)["mask_needed"]));

    out
}
