//! Threshold rules turning fused weather and air quality into advice.

use crate::model::{AirQualityReading, DailyForecast};

pub const NO_WEATHER_CLOTHING: &str = "N/A (weather data unavailable)";

/// Precipitation probability (percent) from which an umbrella is advised.
pub const UMBRELLA_PRECIP_THRESHOLD: u8 = 40;

/// AQI from which a mask is advised.
pub const MASK_AQI_THRESHOLD: f64 = 101.0;

const NOTE_TRANSIT: &str = "Public transit recommended";
const NOTE_EARLY: &str = "Best to visit attractions early morning to avoid crowds";
const NOTE_UMBRELLA: &str = "Bring waterproof or umbrella";
const NOTE_NO_WEATHER: &str = "No umbrella recommendation (weather unavailable)";

/// Clothing advice for a temperature in Celsius.
pub fn clothing_for(temp_c: f64) -> &'static str {
    if temp_c < 5.0 {
        "Heavy winter jacket, gloves, scarf"
    } else if temp_c < 15.0 {
        "Light coat or sweater"
    } else if temp_c < 25.0 {
        "Long sleeve shirt or light layers"
    } else {
        "Shorts, t-shirt, breathable clothing"
    }
}

/// Clothing advice for the average daily high.
pub fn clothing(daily: &DailyForecast) -> String {
    daily
        .average_high()
        .map_or(NO_WEATHER_CLOTHING, clothing_for)
        .to_string()
}

/// Any day at or above the precipitation threshold.
///
/// Always `false` without temperature data: a blank forecast says nothing
/// about rain.
pub fn umbrella(daily: &DailyForecast) -> bool {
    daily.has_temperature() && daily.max_precip() >= UMBRELLA_PRECIP_THRESHOLD
}

pub fn mask(air: &AirQualityReading) -> bool {
    air.aqi.is_some_and(|aqi| aqi >= MASK_AQI_THRESHOLD)
}

/// All advisories for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub clothing: String,
    pub umbrella: bool,
    pub mask: bool,
    pub notes: Vec<String>,
}

impl Advisory {
    pub fn derive(daily: &DailyForecast, air: &AirQualityReading) -> Self {
        let umbrella = umbrella(daily);

        let mut notes = vec![NOTE_TRANSIT.to_string()];
        if umbrella {
            notes.push(NOTE_UMBRELLA.to_string());
        } else if !daily.has_temperature() {
            notes.push(NOTE_NO_WEATHER.to_string());
        }
        notes.push(NOTE_EARLY.to_string());

        Self { clothing: clothing(daily), umbrella, mask: mask(air), notes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSource, DayForecast};

    fn forecast(days: &[(Option<f64>, u8)]) -> DailyForecast {
        let entries = days.iter().map(|(high, precip)| DayForecast::new(*high, None, *precip)).collect();
        DailyForecast::normalized(entries, days.len())
    }

    #[test]
    fn clothing_bands() {
        assert_eq!(clothing_for(-3.0), "Heavy winter jacket, gloves, scarf");
        assert_eq!(clothing_for(4.99), "Heavy winter jacket, gloves, scarf");
        assert_eq!(clothing_for(5.0), "Light coat or sweater");
        assert_eq!(clothing_for(15.0), "Long sleeve shirt or light layers");
        assert_eq!(clothing_for(24.9), "Long sleeve shirt or light layers");
        assert_eq!(clothing_for(25.0), "Shorts, t-shirt, breathable clothing");
    }

    #[test]
    fn clothing_uses_average_high() {
        let daily = forecast(&[(Some(20.0), 0), (Some(21.0), 0), (Some(22.0), 0)]);
        assert_eq!(clothing(&daily), "Long sleeve shirt or light layers");

        let daily = forecast(&[(Some(2.0), 0), (None, 0), (Some(6.0), 0)]);
        assert_eq!(clothing(&daily), "Heavy winter jacket, gloves, scarf");

        assert_eq!(clothing(&DailyForecast::unavailable(3)), NO_WEATHER_CLOTHING);
    }

    #[test]
    fn umbrella_iff_any_day_reaches_threshold() {
        for precip in [0u8, 10, 39, 40, 41, 100] {
            let daily = forecast(&[(Some(15.0), 0), (Some(15.0), precip), (None, 5)]);
            assert_eq!(umbrella(&daily), precip >= 40, "precip {precip}");
        }
    }

    #[test]
    fn umbrella_forced_off_without_temperatures() {
        let daily = forecast(&[(None, 90), (None, 90), (None, 90)]);
        assert!(!umbrella(&daily));
    }

    #[test]
    fn mask_threshold() {
        let reading = |aqi| AirQualityReading::classified(aqi, DataSource::Primary);
        assert!(!mask(&reading(Some(100.0))));
        assert!(mask(&reading(Some(101.0))));
        assert!(mask(&reading(Some(150.0))));
        assert!(!mask(&reading(None)));
    }

    #[test]
    fn notes_mention_umbrella_or_missing_weather() {
        let air = AirQualityReading::unknown();

        let rainy = Advisory::derive(&forecast(&[(Some(10.0), 60)]), &air);
        assert_eq!(
            rainy.notes,
            [
                "Public transit recommended",
                "Bring waterproof or umbrella",
                "Best to visit attractions early morning to avoid crowds"
            ]
        );

        let blank = Advisory::derive(&DailyForecast::unavailable(3), &air);
        assert_eq!(blank.notes[1], "No umbrella recommendation (weather unavailable)");
        assert!(!blank.umbrella);

        let dry = Advisory::derive(&forecast(&[(Some(10.0), 10)]), &air);
        assert_eq!(dry.notes.len(), 2);
    }
}
