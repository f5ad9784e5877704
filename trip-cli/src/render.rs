//! Human-friendly console output.

use std::fmt::Write as _;

use trip_core::{CityFailure, TripResult, model::DayForecast};

const RULE: &str = "------------------------------------------------";

pub fn city_block(result: &TripResult, radius_km: f64) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{RULE}");
    let _ = writeln!(out, "*** {} ***", result.city);
    if !result.address.is_empty() {
        let _ = writeln!(out, "Address: {}", result.address);
    }
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "Top nearby spots (<= {radius_km} km):");
    if result.attractions.is_empty() {
        let _ = writeln!(out, "  - No attractions found within {radius_km} km.");
    }
    for place in &result.attractions {
        if place.address.is_empty() {
            let _ = writeln!(out, "  - {} | {} km | {}", place.name, place.distance_km, place.kind);
        } else {
            let _ = writeln!(
                out,
                "  - {} | {} | {} km | {}",
                place.name, place.address, place.distance_km, place.kind
            );
        }
    }
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "Weather by day ({}):", result.weather_source);
    if result.daily.has_temperature() {
        let days: Vec<String> =
            result.daily.days().iter().enumerate().map(|(i, d)| day(i, d)).collect();
        let _ = writeln!(out, "  {}", days.join("; "));
    } else {
        let _ = writeln!(out, "  N/A (weather data unavailable)");
    }
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "Best wear: {}", result.clothing);
    let _ = writeln!(out, "{RULE}");

    match result.air_quality.aqi {
        Some(aqi) => {
            let _ = writeln!(out, "AQI: {aqi} - {}", result.air_quality.category);
        }
        None => {
            let _ = writeln!(out, "AQI: N/A (air quality data unavailable)");
        }
    }
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "Quick notes:");
    for note in &result.notes {
        let _ = writeln!(out, "  - {note}");
    }
    let _ = writeln!(out, "{RULE}");

    out
}

fn day(index: usize, day: &DayForecast) -> String {
    let temp = |t: Option<f64>| t.map_or("N/A".to_string(), |t| t.to_string());
    format!(
        "Day {}: {} / {} °C, {}% precip",
        index + 1,
        temp(day.high),
        temp(day.low),
        day.precip
    )
}

pub fn failure_line(failure: &CityFailure) -> String {
    format!("Error processing '{}': {}", failure.city, failure.error)
}

pub fn masks_line(masks_needed: usize) -> String {
    format!("TOTAL MASKS NEEDED: {masks_needed}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use trip_core::{
        AirQualityReading, Attraction, DailyForecast, DataSource, TripError,
    };

    fn result(daily: DailyForecast, aqi: Option<f64>) -> TripResult {
        TripResult {
            city: "Paris".to_string(),
            address: "Paris, Example Address".to_string(),
            lat: 48.8566,
            lng: 2.3522,
            attractions: vec![Attraction {
                name: "Paris Main Museum".to_string(),
                address: "123 Main St, Paris".to_string(),
                distance_km: 0.6,
                kind: "museum".to_string(),
            }],
            daily,
            weather_source: DataSource::Mock,
            air_quality: AirQualityReading::classified(aqi, DataSource::Mock),
            clothing: "Long sleeve shirt or light layers".to_string(),
            umbrella: false,
            mask: false,
            notes: vec!["Public transit recommended".to_string()],
        }
    }

    #[test]
    fn block_lists_days_and_aqi() {
        let daily = DailyForecast::normalized(
            vec![
                DayForecast::new(Some(20.0), Some(12.0), 10),
                DayForecast::new(Some(21.5), None, 30),
            ],
            2,
        );
        let text = city_block(&result(daily, Some(40.0)), 2.0);

        assert!(text.contains("*** Paris ***"));
        assert!(text.contains("Day 1: 20 / 12 °C, 10% precip; Day 2: 21.5 / N/A °C, 30% precip"));
        assert!(text.contains("AQI: 40 - Good"));
        assert!(text.contains("  - Paris Main Museum | 123 Main St, Paris | 0.6 km | museum"));
        assert!(text.contains("  - Public transit recommended"));
    }

    #[test]
    fn block_marks_missing_data() {
        let text = city_block(&result(DailyForecast::unavailable(3), None), 2.0);
        assert!(text.contains("  N/A (weather data unavailable)"));
        assert!(text.contains("AQI: N/A (air quality data unavailable)"));
    }

    #[test]
    fn failure_and_total_lines() {
        let failure = CityFailure {
            city: "Atlantis".to_string(),
            error: TripError::geocoding("Atlantis", "ZERO_RESULTS", "No results"),
        };
        assert_eq!(
            failure_line(&failure),
            "Error processing 'Atlantis': Geocoding failed for 'Atlantis' (status: ZERO_RESULTS) - No results"
        );
        assert_eq!(masks_line(2), "TOTAL MASKS NEEDED: 2");
    }
}
