//! Merging primary and secondary provider outputs into one value per city.
//!
//! Preference order is fixed: the secondary provider wins whenever it is
//! configured and produced something usable, the primary provider is the
//! fallback, and an all-null placeholder is the last resort.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    model::{AirQualityReading, DailyForecast, DataSource, ForecastWindow, Location},
    provider::{AirQualityProvider, ForecastProvider},
};

/// Secondary 1-5 index to (category, estimated EPA AQI).
///
/// A coarse approximation with no cited source, not a scientific conversion.
pub const SECONDARY_AQI_TABLE: [(i64, &str, f64); 5] = [
    (1, "Good", 40.0),
    (2, "Fair", 75.0),
    (3, "Moderate", 125.0),
    (4, "Poor", 175.0),
    (5, "Very Poor", 250.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FusedForecast {
    pub daily: DailyForecast,
    pub source: DataSource,
}

/// Pick one forecast series for `location`, always exactly `window.days` long.
pub async fn fuse_forecast(
    primary: &dyn ForecastProvider,
    secondary: Option<&dyn ForecastProvider>,
    location: &Location,
    window: ForecastWindow,
) -> FusedForecast {
    if let Some(secondary) = secondary {
        let daily = window.select(secondary.daily_forecast(location, window).await);
        if daily.has_data() {
            info!(source = %secondary.source(), "using secondary forecast");
            return FusedForecast { daily, source: secondary.source() };
        }
        debug!("secondary forecast has no data for the window, falling back to primary");
    }

    let daily = window.select(primary.daily_forecast(location, window).await);
    if daily.has_data() {
        return FusedForecast { daily, source: primary.source() };
    }

    warn!(address = %location.address, "no forecast available from any provider");
    FusedForecast { daily: DailyForecast::unavailable(window.days), source: DataSource::Unavailable }
}

/// Pick one air-quality reading for `location`.
pub async fn fuse_air_quality(
    primary: &dyn AirQualityProvider,
    secondary: Option<&dyn AirQualityProvider>,
    location: &Location,
) -> AirQualityReading {
    if let Some(secondary) = secondary {
        if let Some(reading) = secondary.air_quality(location).await.filter(|r| r.aqi.is_some()) {
            info!(source = %reading.source, aqi = ?reading.aqi, "using secondary air quality");
            return reading;
        }
        debug!("secondary air quality unavailable, falling back to primary");
    }

    match primary.air_quality(location).await {
        Some(reading) => reading,
        None => {
            warn!(address = %location.address, "no air quality available from any provider");
            AirQualityReading::unknown()
        }
    }
}

/// Map the secondary provider's 1-5 index through [`SECONDARY_AQI_TABLE`].
pub fn estimate_from_index(index: i64) -> Option<AirQualityReading> {
    SECONDARY_AQI_TABLE
        .iter()
        .find(|(i, _, _)| *i == index)
        .map(|(_, category, estimate)| AirQualityReading {
            aqi: Some(*estimate),
            category: (*category).to_string(),
            source: DataSource::Secondary,
        })
}

/// The ways a numeric AQI is dug out of a primary air-quality payload, in
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiStrategy {
    /// `indexes[]` entry with `code == "uaqi"`.
    UniversalIndex,
    /// First entry of `indexes[]`.
    FirstIndex,
    /// `hourlyForecasts[0].indexes[0].aqi`.
    HourlyForecast,
    /// `aqi`/`AQI`/`value` in the first element of a common list key.
    CommonContainer,
    /// Any numeric `aqi` key anywhere in the document.
    Recursive,
}

impl AqiStrategy {
    pub const ORDER: [AqiStrategy; 5] = [
        AqiStrategy::UniversalIndex,
        AqiStrategy::FirstIndex,
        AqiStrategy::HourlyForecast,
        AqiStrategy::CommonContainer,
        AqiStrategy::Recursive,
    ];

    fn apply(self, payload: &Map<String, Value>) -> Option<f64> {
        match self {
            AqiStrategy::UniversalIndex => payload
                .get("indexes")?
                .as_array()?
                .iter()
                .find(|idx| idx.get("code").and_then(Value::as_str) == Some("uaqi"))?
                .get("aqi")?
                .as_f64(),
            AqiStrategy::FirstIndex => {
                payload.get("indexes")?.as_array()?.first()?.get("aqi")?.as_f64()
            }
            AqiStrategy::HourlyForecast => payload
                .get("hourlyForecasts")?
                .as_array()?
                .first()?
                .get("indexes")?
                .as_array()?
                .first()?
                .get("aqi")?
                .as_f64(),
            AqiStrategy::CommonContainer => ["data", "forecasts", "results", "hourly"]
                .iter()
                .filter_map(|key| payload.get(*key)?.as_array()?.first())
                .find_map(|item| {
                    ["aqi", "AQI", "value"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(Value::as_f64))
                }),
            AqiStrategy::Recursive => find_aqi_recursive(payload),
        }
    }
}

/// Extract a numeric AQI from a primary air-quality payload.
///
/// Strategies run in [`AqiStrategy::ORDER`]; `None` when none of them finds a
/// number. A hit from the recursive search is logged as a warning since it
/// means the upstream layout changed.
pub fn extract_aqi(payload: &Value) -> Option<f64> {
    let payload = payload.as_object()?;

    for strategy in AqiStrategy::ORDER {
        if let Some(aqi) = strategy.apply(payload) {
            if strategy == AqiStrategy::Recursive {
                warn!(aqi, "AQI found only by recursive search; provider payload shape changed?");
            } else {
                debug!(?strategy, aqi, "AQI extracted");
            }
            return Some(aqi);
        }
    }

    None
}

fn find_aqi_recursive(obj: &Map<String, Value>) -> Option<f64> {
    for (key, value) in obj {
        if key.eq_ignore_ascii_case("aqi") {
            if let Some(aqi) = value.as_f64() {
                return Some(aqi);
            }
        }
        if let Some(aqi) = find_in_value(value) {
            return Some(aqi);
        }
    }
    None
}

fn find_in_value(value: &Value) -> Option<f64> {
    match value {
        Value::Object(obj) => find_aqi_recursive(obj),
        Value::Array(items) => items.iter().find_map(find_in_value),
        _ => None,
    }
}
