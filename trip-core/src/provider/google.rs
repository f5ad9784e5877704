use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::{
    attractions::{PlaceCandidate, select_nearby},
    config::Endpoints,
    error::TripError,
    fusion::extract_aqi,
    model::{AirQualityReading, Attraction, DataSource, DayForecast, ForecastWindow, Location},
    provider::{openweather::OneCallDay, percent_from_value, truncate_body},
};

use super::{AirQualityProvider, AttractionProvider, ForecastProvider, Geocoder, fetch_json};

/// Google's forecast endpoint never returns more than ten days.
const GOOGLE_MAX_FORECAST_DAYS: usize = 10;

/// Client for the Google Maps Platform APIs: geocoding, weather, air quality, places.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    api_key: String,
    http: Client,
    endpoints: Endpoints,
}

impl GoogleClient {
    pub fn new(api_key: String, http: Client, endpoints: Endpoints) -> Self {
        Self { api_key, http, endpoints }
    }

    /// Try the forecast endpoint, then current conditions via GET, then via POST.
    ///
    /// The first payload with a recognised layout and at least one day wins.
    async fn weather_series(&self, location: &Location, horizon: usize) -> Vec<DayForecast> {
        let days = horizon.clamp(1, GOOGLE_MAX_FORECAST_DAYS).to_string();
        let lat = location.lat.to_string();
        let lng = location.lng.to_string();
        let current_url = format!("{}/v1/currentConditions:lookup", self.endpoints.google_weather);

        let attempts = [
            (
                "Google weather forecast",
                self.http
                    .get(format!("{}/v1/forecast/days:lookup", self.endpoints.google_weather))
                    .query(&[
                        ("key", self.api_key.as_str()),
                        ("location.latitude", lat.as_str()),
                        ("location.longitude", lng.as_str()),
                        ("days", days.as_str()),
                        ("pageSize", days.as_str()),
                    ]),
            ),
            (
                "Google current conditions",
                self.http.get(&current_url).query(&[
                    ("key", self.api_key.as_str()),
                    ("location.latitude", lat.as_str()),
                    ("location.longitude", lng.as_str()),
                ]),
            ),
            (
                "Google current conditions (POST)",
                self.http
                    .post(&current_url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&location_body(location)),
            ),
        ];

        for (what, request) in attempts {
            match fetch_json(request, what).await {
                Ok(value) => match WeatherPayload::classify(value) {
                    Some(payload) => {
                        let layout = payload.layout();
                        let series = payload.into_series(horizon);
                        if !series.is_empty() {
                            debug!(layout, days = series.len(), "{what} returned a usable payload");
                            return series;
                        }
                        debug!(layout, "{what} payload has no days");
                    }
                    None => debug!("{what} payload has no recognised layout"),
                },
                Err(err) => warn!("{err:#}"),
            }
        }

        Vec::new()
    }
}

fn location_body(location: &Location) -> Value {
    json!({ "location": { "latitude": location.lat, "longitude": location.lng } })
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[async_trait]
impl Geocoder for GoogleClient {
    #[instrument(skip(self), level = "debug")]
    async fn geocode(&self, query: &str) -> Result<Location, TripError> {
        let url = format!("{}/maps/api/geocode/json", self.endpoints.google_maps);

        let res = self
            .http
            .get(url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(TripError::geocoding(
                query,
                format!("HTTP {status}"),
                truncate_body(&body),
            ));
        }

        let parsed: GeocodeResponse = serde_json::from_str(&body).map_err(|err| {
            TripError::geocoding(query, "INVALID_RESPONSE", format!("malformed JSON: {err}"))
        })?;

        let GeocodeResponse { status, error_message, results } = parsed;
        match results.into_iter().next() {
            Some(first) if status == "OK" => Ok(Location {
                lat: first.geometry.location.lat,
                lng: first.geometry.location.lng,
                address: first.formatted_address.unwrap_or_else(|| query.to_string()),
            }),
            _ => Err(TripError::geocoding(
                query,
                status,
                error_message.unwrap_or_else(|| "No results".to_string()),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Degrees {
    degrees: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct HighLow {
    high: Option<f64>,
    low: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Probability {
    percent: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Precipitation {
    probability: Option<Probability>,
}

impl Precipitation {
    fn percent(&self) -> u8 {
        self.probability
            .as_ref()
            .and_then(|p| p.percent.as_ref())
            .map(percent_from_value)
            .unwrap_or(0)
    }
}

/// `forecastDays[]` from the forecast endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ForecastDay {
    max_temperature: Option<Degrees>,
    min_temperature: Option<Degrees>,
    daytime_forecast: Option<DaytimeForecast>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaytimeForecast {
    precipitation: Option<Precipitation>,
}

/// `dailyForecasts[]` as returned by older weather lookups.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DailyForecastEntry {
    max_temp: Option<Degrees>,
    min_temp: Option<Degrees>,
    temperature: Option<HighLow>,
    precipitation: Option<Precipitation>,
}

/// Flat current-conditions object.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentConditions {
    temperature: Option<Degrees>,
    precipitation: Option<Precipitation>,
}

/// The weather layouts we know how to read.
#[derive(Debug)]
enum WeatherPayload {
    ForecastDays(Vec<ForecastDay>),
    DailyForecasts(Vec<DailyForecastEntry>),
    Daily(Vec<OneCallDay>),
    Current(CurrentConditions),
}

impl WeatherPayload {
    fn classify(value: Value) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };

        let parsed = if let Some(days) = obj.remove("forecastDays") {
            serde_json::from_value(days).map(Self::ForecastDays)
        } else if let Some(days) = obj.remove("dailyForecasts") {
            serde_json::from_value(days).map(Self::DailyForecasts)
        } else if let Some(days) = obj.remove("daily") {
            serde_json::from_value(days).map(Self::Daily)
        } else if let Some(current) = obj.remove("currentConditions") {
            serde_json::from_value(current).map(Self::Current)
        } else if obj.contains_key("temperature") {
            serde_json::from_value(Value::Object(obj)).map(Self::Current)
        } else {
            return None;
        };

        parsed
            .map_err(|err| warn!("Google weather payload did not match its layout: {err}"))
            .ok()
    }

    fn layout(&self) -> &'static str {
        match self {
            WeatherPayload::ForecastDays(_) => "forecastDays",
            WeatherPayload::DailyForecasts(_) => "dailyForecasts",
            WeatherPayload::Daily(_) => "daily",
            WeatherPayload::Current(_) => "currentConditions",
        }
    }

    /// Normalize to a series starting today. Current conditions are repeated
    /// for every requested day.
    fn into_series(self, horizon: usize) -> Vec<DayForecast> {
        match self {
            WeatherPayload::ForecastDays(days) => days
                .into_iter()
                .map(|d| {
                    DayForecast::new(
                        d.max_temperature.and_then(|t| t.degrees),
                        d.min_temperature.and_then(|t| t.degrees),
                        d.daytime_forecast
                            .and_then(|f| f.precipitation)
                            .map(|p| p.percent())
                            .unwrap_or(0),
                    )
                })
                .collect(),
            WeatherPayload::DailyForecasts(days) => days
                .into_iter()
                .map(|d| {
                    let range = d.temperature.unwrap_or_default();
                    DayForecast::new(
                        d.max_temp.and_then(|t| t.degrees).or(range.high),
                        d.min_temp.and_then(|t| t.degrees).or(range.low),
                        d.precipitation.map(|p| p.percent()).unwrap_or(0),
                    )
                })
                .collect(),
            WeatherPayload::Daily(days) => days.iter().map(OneCallDay::to_day).collect(),
            WeatherPayload::Current(current) => {
                let temp = current.temperature.and_then(|t| t.degrees);
                let precip = current.precipitation.map(|p| p.percent()).unwrap_or(0);
                vec![DayForecast::new(temp, temp, precip); horizon]
            }
        }
    }
}

#[async_trait]
impl ForecastProvider for GoogleClient {
    fn source(&self) -> DataSource {
        DataSource::Primary
    }

    #[instrument(skip(self), level = "debug")]
    async fn daily_forecast(
        &self,
        location: &Location,
        window: ForecastWindow,
    ) -> Vec<DayForecast> {
        self.weather_series(location, window.horizon()).await
    }
}

#[async_trait]
impl AirQualityProvider for GoogleClient {
    fn source(&self) -> DataSource {
        DataSource::Primary
    }

    #[instrument(skip(self), level = "debug")]
    async fn air_quality(&self, location: &Location) -> Option<AirQualityReading> {
        let request = self
            .http
            .post(format!("{}/v1/currentConditions:lookup", self.endpoints.google_air_quality))
            .query(&[("key", self.api_key.as_str())])
            .json(&location_body(location));

        match fetch_json(request, "Google air quality").await {
            Ok(value) => Some(AirQualityReading::classified(extract_aqi(&value), DataSource::Primary)),
            Err(err) => {
                warn!("{err:#}");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: Option<String>,
    geometry: Option<Geometry>,
    #[serde(default)]
    types: Vec<String>,
    formatted_address: Option<String>,
    vicinity: Option<String>,
}

impl PlaceResult {
    fn into_candidate(self) -> Option<PlaceCandidate> {
        let position = self.geometry?.location;
        Some(PlaceCandidate {
            name: self.name.unwrap_or_default(),
            address: self.formatted_address.or(self.vicinity).unwrap_or_default(),
            lat: position.lat,
            lng: position.lng,
            kind: self.types.into_iter().next().unwrap_or_else(|| "attraction".to_string()),
        })
    }
}

#[async_trait]
impl AttractionProvider for GoogleClient {
    #[instrument(skip(self, location), level = "debug")]
    async fn attractions(
        &self,
        city: &str,
        location: &Location,
        radius_km: f64,
        max_results: usize,
    ) -> Vec<Attraction> {
        let query = format!("tourist attractions in {city}");
        let request = self
            .http
            .get(format!("{}/maps/api/place/textsearch/json", self.endpoints.google_maps))
            .query(&[("query", query.as_str()), ("key", self.api_key.as_str())]);

        let value = match fetch_json(request, "Google places text search").await {
            Ok(value) => value,
            Err(err) => {
                warn!("{err:#}");
                return Vec::new();
            }
        };

        let parsed: TextSearchResponse = match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Failed to parse Google places results: {err}");
                return Vec::new();
            }
        };

        let candidates = parsed
            .results
            .into_iter()
            .filter_map(PlaceResult::into_candidate)
            .collect();

        select_nearby(candidates, location, radius_km, max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleClient {
        GoogleClient::new("test_key".to_string(), Client::new(), Endpoints::all_at(&server.uri()))
    }

    fn paris() -> Location {
        Location { lat: 48.8566, lng: 2.3522, address: "Paris, France".to_string() }
    }

    #[tokio::test]
    async fn geocode_returns_first_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("address", "Paris"))
            .and(query_param("key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "formatted_address": "Paris, France",
                    "geometry": { "location": { "lat": 48.8566, "lng": 2.3522 } }
                }]
            })))
            .mount(&server)
            .await;

        let location = client(&server).geocode("Paris").await.unwrap();
        assert_eq!(location, paris());
    }

    #[tokio::test]
    async fn geocode_fails_on_non_ok_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "results": []
            })))
            .mount(&server)
            .await;

        let err = client(&server).geocode("Paris").await.unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, TripError::Geocoding { .. }));
        assert!(msg.contains("REQUEST_DENIED"));
        assert!(msg.contains("The provided API key is invalid."));
    }

    #[tokio::test]
    async fn geocode_fails_on_zero_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "ZERO_RESULTS", "results": [] })),
            )
            .mount(&server)
            .await;

        let err = client(&server).geocode("Atlantis").await.unwrap_err();
        assert!(err.to_string().contains("ZERO_RESULTS"));
        assert!(err.to_string().contains("No results"));
    }

    #[tokio::test]
    async fn geocode_fails_on_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).geocode("Paris").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn forecast_days_layout_is_normalized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast/days:lookup"))
            .and(query_param("days", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "forecastDays": [
                    {
                        "maxTemperature": { "degrees": 18.5 },
                        "minTemperature": { "degrees": 9.0 },
                        "daytimeForecast": { "precipitation": { "probability": { "percent": 55 } } }
                    },
                    { "minTemperature": { "degrees": 8.0 } }
                ]
            })))
            .mount(&server)
            .await;

        let series = client(&server).daily_forecast(&paris(), ForecastWindow::default()).await;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], DayForecast::new(Some(18.5), Some(9.0), 55));
        assert_eq!(series[1], DayForecast::new(None, Some(8.0), 0));
    }

    #[tokio::test]
    async fn falls_back_to_current_conditions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast/days:lookup"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/currentConditions:lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "temperature": { "degrees": 12.0 },
                "precipitation": { "probability": { "percent": 40 } }
            })))
            .mount(&server)
            .await;

        let series = client(&server).daily_forecast(&paris(), ForecastWindow::default()).await;
        assert_eq!(series, vec![DayForecast::new(Some(12.0), Some(12.0), 40); 3]);
    }

    #[tokio::test]
    async fn posts_when_get_payload_is_unrecognised() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast/days:lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/currentConditions:lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "bad" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/currentConditions:lookup"))
            .and(body_json(json!({ "location": { "latitude": 48.8566, "longitude": 2.3522 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dailyForecasts": [
                    { "temperature": { "high": 21.0, "low": 13.0 } },
                    { "maxTemp": { "degrees": 22.0 }, "precipitation": { "probability": { "percent": 70 } } }
                ]
            })))
            .mount(&server)
            .await;

        let series = client(&server).daily_forecast(&paris(), ForecastWindow::default()).await;
        assert_eq!(series[0], DayForecast::new(Some(21.0), Some(13.0), 0));
        assert_eq!(series[1], DayForecast::new(Some(22.0), None, 70));
    }

    #[tokio::test]
    async fn empty_forecast_days_fall_back_to_current_conditions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast/days:lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "forecastDays": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/currentConditions:lookup"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "temperature": { "degrees": 12.0 } })),
            )
            .mount(&server)
            .await;

        let series = client(&server).daily_forecast(&paris(), ForecastWindow::default()).await;
        assert_eq!(series, vec![DayForecast::new(Some(12.0), Some(12.0), 0); 3]);
    }

    #[tokio::test]
    async fn forecast_is_empty_when_every_attempt_fails() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let series = client(&server).daily_forecast(&paris(), ForecastWindow::default()).await;
        assert!(series.is_empty());
    }

    #[test]
    fn one_call_layout_is_recognised() {
        let payload = WeatherPayload::classify(json!({
            "daily": [{ "temp": { "max": 25.0, "min": 15.0 }, "pop": 0.45 }]
        }))
        .unwrap();

        assert_eq!(payload.layout(), "daily");
        assert_eq!(payload.into_series(3), vec![DayForecast::new(Some(25.0), Some(15.0), 45)]);
    }

    #[test]
    fn nested_current_conditions_are_recognised() {
        let payload = WeatherPayload::classify(json!({
            "currentConditions": { "temperature": { "degrees": 4.0 } }
        }))
        .unwrap();

        assert_eq!(payload.into_series(2), vec![DayForecast::new(Some(4.0), Some(4.0), 0); 2]);
        assert!(WeatherPayload::classify(json!({ "foo": 1 })).is_none());
        assert!(WeatherPayload::classify(json!([1, 2])).is_none());
    }

    #[tokio::test]
    async fn air_quality_reads_universal_index() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/currentConditions:lookup"))
            .and(query_param("key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [
                    { "code": "fra_atmo", "aqi": 2 },
                    { "code": "uaqi", "aqi": 64, "category": "Good air quality" }
                ]
            })))
            .mount(&server)
            .await;

        let reading = client(&server).air_quality(&paris()).await.unwrap();
        assert_eq!(reading.aqi, Some(64.0));
        assert_eq!(reading.category, "Moderate");
        assert_eq!(reading.source, DataSource::Primary);
    }

    #[tokio::test]
    async fn air_quality_failure_is_no_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        assert!(client(&server).air_quality(&paris()).await.is_none());
    }

    #[tokio::test]
    async fn attractions_are_filtered_and_sorted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/place/textsearch/json"))
            .and(query_param("query", "tourist attractions in Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {
                        "name": "Eiffel Tower",
                        "formatted_address": "Champ de Mars, Paris",
                        "types": ["tourist_attraction", "point_of_interest"],
                        "geometry": { "location": { "lat": 48.8584, "lng": 2.2945 } }
                    },
                    {
                        "name": "Notre-Dame",
                        "vicinity": "6 Parvis Notre-Dame",
                        "types": ["church"],
                        "geometry": { "location": { "lat": 48.8530, "lng": 2.3499 } }
                    },
                    { "name": "No geometry" }
                ]
            })))
            .mount(&server)
            .await;

        let places = client(&server).attractions("Paris", &paris(), 2.0, 5).await;
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Notre-Dame");
        assert_eq!(places[0].address, "6 Parvis Notre-Dame");
        assert_eq!(places[0].kind, "church");

        let wider = client(&server).attractions("Paris", &paris(), 5.0, 5).await;
        assert_eq!(wider.len(), 2);
        assert!(wider[0].distance_km <= wider[1].distance_km);
    }
}
