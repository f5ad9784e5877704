use chrono::NaiveDate;
use trip_core::{
    CityOutcome, DataSource, ExportFormat, Providers, Settings, TripAgent, TripError, TripPlanner,
    TripResult, export, provider::mock::MockProvider,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn planner() -> TripPlanner {
    TripPlanner::new(Providers::mock(), &Settings::default(), today())
}

#[tokio::test]
async fn paris_mock_scenario() {
    let report = planner().plan(&["Paris"]).await;
    assert_eq!(report.masks_needed, 0);

    let results = report.into_results();
    let paris = &results[0];
    assert_eq!(paris.address, "Paris, Example Address");
    assert_eq!((paris.lat, paris.lng), (48.8566, 2.3522));

    let highs: Vec<Option<f64>> = paris.daily.days().iter().map(|d| d.high).collect();
    assert_eq!(highs, [Some(20.0), Some(21.0), Some(22.0)]);
    assert_eq!(paris.weather_source, DataSource::Mock);
    assert_eq!(paris.clothing, "Long sleeve shirt or light layers");
    assert!(!paris.umbrella);

    assert_eq!(paris.air_quality.aqi, Some(40.0));
    assert_eq!(paris.air_quality.category, "Good");
    assert!(!paris.mask);

    let names: Vec<&str> = paris.attractions.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Paris Main Museum", "Paris Old Town"]);
    assert_eq!(
        paris.notes,
        [
            "Public transit recommended",
            "Best to visit attractions early morning to avoid crowds"
        ]
    );
}

#[tokio::test]
async fn batch_keeps_order_and_survives_bad_tokens() {
    let report = planner()
        .plan(&["Tokyo", "Paris:2026-02-30", "New York:2026-03-02:2026-03-08", "Paris"])
        .await;

    assert_eq!(report.outcomes.len(), 4);
    match &report.outcomes[1] {
        CityOutcome::Failed(failure) => {
            assert_eq!(failure.city, "Paris");
            assert!(matches!(failure.error, TripError::InvalidInput { .. }));
        }
        CityOutcome::Planned(result) => panic!("expected a failure, got {}", result.city),
    }

    let results = report.into_results();
    let cities: Vec<&str> = results.iter().map(|r| r.city.as_str()).collect();
    assert_eq!(cities, ["Tokyo", "New York", "Paris"]);
    assert_eq!(results[1].daily.len(), 7);
    assert_eq!(results[0].daily.len(), 3);
}

#[tokio::test]
async fn exported_json_matches_planned_results() {
    let results = planner().plan(&["Paris", "Tokyo"]).await.into_results();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(ExportFormat::Json.default_file_name());
    export::export(&results, ExportFormat::Json, &path).unwrap();

    let parsed: Vec<TripResult> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, results);
}

#[tokio::test]
async fn agent_and_planner_agree_on_advice() {
    let agent = TripAgent::new(
        Providers::mock(),
        Box::new(MockProvider),
        &Settings::default(),
        today(),
    );
    let report = agent.run("Paris").await.unwrap();

    let planned = planner().plan(&["Paris"]).await.into_results();
    assert_eq!(report.result.clothing, planned[0].clothing);
    assert_eq!(report.result.mask, planned[0].mask);
    assert_eq!(report.result.umbrella, planned[0].umbrella);
    assert_eq!(report.transcript.len(), 7);
}
