use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TripError;

/// Number of forecast days reported when no date range is requested.
pub const DEFAULT_FORECAST_DAYS: usize = 3;

/// Longest date range a city request may cover, and the furthest ahead a
/// window may start. No upstream forecasts beyond it.
pub const MAX_FORECAST_DAYS: usize = 16;

/// A geocoded place. Every lookup after geocoding is keyed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

/// One day of a normalized forecast. Missing temperatures stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub high: Option<f64>,
    pub low: Option<f64>,
    /// Precipitation probability in percent, 0..=100.
    pub precip: u8,
}

impl DayForecast {
    pub const UNAVAILABLE: DayForecast = DayForecast { high: None, low: None, precip: 0 };

    pub fn new(high: Option<f64>, low: Option<f64>, precip: u8) -> Self {
        Self { high, low, precip: precip.min(100) }
    }
}

/// Chronological daily forecast, day 0 first.
///
/// Only built through [`DailyForecast::normalized`], so its length always equals
/// the requested window, whatever the upstream returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyForecast(Vec<DayForecast>);

impl DailyForecast {
    /// Truncate or pad `entries` with [`DayForecast::UNAVAILABLE`] to exactly `len` days.
    pub fn normalized(mut entries: Vec<DayForecast>, len: usize) -> Self {
        entries.truncate(len);
        entries.resize(len, DayForecast::UNAVAILABLE);
        Self(entries)
    }

    pub fn unavailable(len: usize) -> Self {
        Self::normalized(Vec::new(), len)
    }

    pub fn days(&self) -> &[DayForecast] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean of the available daily highs, `None` when no day has one.
    pub fn average_high(&self) -> Option<f64> {
        let highs: Vec<f64> = self.0.iter().filter_map(|d| d.high).collect();
        if highs.is_empty() {
            None
        } else {
            Some(highs.iter().sum::<f64>() / highs.len() as f64)
        }
    }

    /// Any day carrying something other than the placeholder.
    pub fn has_data(&self) -> bool {
        self.0.iter().any(|d| *d != DayForecast::UNAVAILABLE)
    }

    pub fn has_temperature(&self) -> bool {
        self.0.iter().any(|d| d.high.is_some())
    }

    pub fn max_precip(&self) -> u8 {
        self.0.iter().map(|d| d.precip).max().unwrap_or(0)
    }
}

/// Which upstream a fused value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Primary,
    Secondary,
    Mock,
    Unavailable,
}

impl DataSource {
    pub fn provider_name(&self) -> &'static str {
        match self {
            DataSource::Primary => "Google",
            DataSource::Secondary => "OpenWeatherMap",
            DataSource::Mock => "Mock",
            DataSource::Unavailable => "none",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_name())
    }
}

/// US EPA AQI bands, ordered by severity. `Unknown` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AqiCategory {
    Unknown,
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Classify an AQI value; band upper bounds are inclusive.
    pub fn from_aqi(aqi: Option<f64>) -> Self {
        let Some(aqi) = aqi.filter(|v| !v.is_nan()) else {
            return AqiCategory::Unknown;
        };

        if aqi <= 50.0 {
            AqiCategory::Good
        } else if aqi <= 100.0 {
            AqiCategory::Moderate
        } else if aqi <= 150.0 {
            AqiCategory::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            AqiCategory::Unhealthy
        } else if aqi <= 300.0 {
            AqiCategory::VeryUnhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AqiCategory::Unknown => "Unknown",
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fused air quality for one location.
///
/// `aqi` is on the US EPA 0-500 scale, or an estimate when it was mapped from
/// the secondary provider's 1-5 index. `category` carries that provider's own
/// label in the latter case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub aqi: Option<f64>,
    pub category: String,
    pub source: DataSource,
}

impl AirQualityReading {
    /// Reading classified with the EPA bands.
    pub fn classified(aqi: Option<f64>, source: DataSource) -> Self {
        Self {
            aqi,
            category: AqiCategory::from_aqi(aqi).to_string(),
            source,
        }
    }

    pub fn unknown() -> Self {
        Self::classified(None, DataSource::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    pub address: String,
    pub distance_km: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Everything gathered and derived for one city. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    pub city: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub attractions: Vec<Attraction>,
    pub daily: DailyForecast,
    pub weather_source: DataSource,
    pub air_quality: AirQualityReading,
    pub clothing: String,
    pub umbrella: bool,
    pub mask: bool,
    pub notes: Vec<String>,
}

/// Which days of the forecast a city request covers, relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastWindow {
    /// Days between today and the first requested day.
    pub offset: usize,
    pub days: usize,
}

impl ForecastWindow {
    /// Number of upstream days needed to cover the window.
    pub fn horizon(&self) -> usize {
        self.offset + self.days
    }

    /// Cut a series that starts today down to the window.
    pub fn select(&self, series: Vec<DayForecast>) -> DailyForecast {
        let entries = series.into_iter().skip(self.offset).collect();
        DailyForecast::normalized(entries, self.days)
    }
}

impl Default for ForecastWindow {
    fn default() -> Self {
        Self { offset: 0, days: DEFAULT_FORECAST_DAYS }
    }
}

/// One city token from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRequest {
    pub city: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CityRequest {
    pub fn new(city: impl Into<String>) -> Self {
        Self { city: city.into(), start: None, end: None }
    }

    /// Parse `City`, `City:YYYY-MM-DD` or `City:YYYY-MM-DD:YYYY-MM-DD`.
    ///
    /// Parts that do not look like a date are ignored.
    pub fn parse(token: &str) -> Result<Self, TripError> {
        let mut parts = token.split(':');
        let city = parts.next().unwrap_or_default().trim().to_string();
        if city.is_empty() {
            return Err(TripError::invalid_input(format!("missing city name in '{token}'")));
        }

        let start = parts.next().map(parse_date).transpose()?.flatten();
        let end = match start {
            Some(start) => parts.next().map(parse_date).transpose()?.flatten().or(Some(start)),
            None => None,
        };

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(TripError::invalid_input(format!(
                    "end date {end} is before start date {start} in '{token}'"
                )));
            }
            if (end - start).num_days() >= MAX_FORECAST_DAYS as i64 {
                return Err(TripError::invalid_input(format!(
                    "date range in '{token}' is longer than {MAX_FORECAST_DAYS} days"
                )));
            }
        }

        Ok(Self { city, start, end })
    }

    pub fn window(&self, today: NaiveDate) -> ForecastWindow {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let days = (end - start).num_days() + 1;
                let offset = (start - today).num_days().max(0);
                ForecastWindow {
                    offset: usize::try_from(offset).unwrap_or(0).min(MAX_FORECAST_DAYS),
                    days: usize::try_from(days)
                        .unwrap_or(DEFAULT_FORECAST_DAYS)
                        .min(MAX_FORECAST_DAYS),
                }
            }
            _ => ForecastWindow::default(),
        }
    }
}

fn parse_date(part: &str) -> Result<Option<NaiveDate>, TripError> {
    let part = part.trim();
    if !looks_like_date(part) {
        return Ok(None);
    }

    NaiveDate::parse_from_str(part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| TripError::invalid_input(format!("'{part}' is not a valid calendar date")))
}

fn looks_like_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
