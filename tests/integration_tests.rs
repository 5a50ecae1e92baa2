// Integration tests for Kovari Compat

use actix_web::{test, web, App};
use kovari_compat::config::{PredictionSettings, Settings};
use kovari_compat::core::{extract_features, CompatibilityScorer};
use kovari_compat::models::{
    LatLon, MatchEventLog, MatchTarget, PredictOptions, SoloEntity, StaticAttributes,
};
use kovari_compat::routes::{self, AppState};
use kovari_compat::services::{MatchEventLogger, MemorySink, PredictionClient};
use kovari_compat::CompatibilityFeatureVector;
use mockito::Matcher;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn traveler(id: &str, lat: f64, lon: f64, budget: f64) -> SoloEntity {
    SoloEntity {
        user_id: Some(id.to_string()),
        destination: Some(LatLon::new(lat, lon)),
        start_date: Some("2025-06-01".to_string()),
        end_date: Some("2025-06-10".to_string()),
        budget: Some(budget),
        static_attributes: StaticAttributes {
            age: Some(26.0),
            interests: Some(vec!["trekking".to_string(), "food".to_string()]),
            personality: Some("extrovert".to_string()),
            ..Default::default()
        },
    }
}

/// A stand-in predictor script that always answers with `score`
fn predictor_script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "cat > /dev/null").unwrap();
    writeln!(file, "{}", body).unwrap();
    file
}

fn client(script: &NamedTempFile) -> PredictionClient {
    let settings = PredictionSettings {
        interpreter: "sh".to_string(),
        script_path: script.path().to_path_buf(),
        spawn_timeout_secs: 5,
        ..Default::default()
    };
    PredictionClient::new(settings).unwrap()
}

fn options(server_url: &str) -> PredictOptions {
    PredictOptions {
        ml_server_url: Some(server_url.to_string()),
        ..Default::default()
    }
}

fn vectors() -> Vec<CompatibilityFeatureVector> {
    let user = traveler("u0", 28.6139, 77.2090, 20_000.0);
    [
        traveler("a", 28.6139, 77.2090, 20_000.0),
        traveler("b", 28.9, 77.5, 12_000.0),
        traveler("c", 19.0760, 72.8777, 60_000.0),
    ]
    .iter()
    .map(|candidate| extract_features(&user, MatchTarget::Solo(candidate)))
    .collect()
}

/// Mock responses score each payload by its distance feature
fn echo_distance(features: &serde_json::Value) -> serde_json::Value {
    let score = features["distanceScore"].as_f64().unwrap_or(0.0);
    serde_json::json!({"success": true, "score": score, "probability": score, "prediction": 1})
}

#[tokio::test]
async fn test_http_500_falls_back_to_spawn() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/predict")
        .with_status(500)
        .create_async()
        .await;

    let script = predictor_script(r#"echo '{"success": true, "score": 0.77, "probability": 0.77}'"#);
    let client = client(&script);

    let result = client.predict(&vectors()[0], &options(&server.url())).await;

    assert_eq!(result.score().map(|s| s.value()), Some(0.77));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_both_transports_failing_yields_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(503)
        .create_async()
        .await;

    let script = predictor_script("echo 'model missing' >&2; exit 2");
    let client = client(&script);

    let result = client.predict(&vectors()[0], &options(&server.url())).await;

    assert!(!result.is_success());
    assert!(result.error().unwrap().contains("model missing"));
}

#[tokio::test]
async fn test_batch_matches_individual_predictions() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_body_from_request(|request| {
            let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
            echo_distance(&body["features"]).to_string().into_bytes()
        })
        .expect_at_least(1)
        .create_async()
        .await;
    server
        .mock("POST", "/predict/batch")
        .with_status(200)
        .with_body_from_request(|request| {
            let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
            let results: Vec<_> = body["features_list"]
                .as_array()
                .unwrap()
                .iter()
                .map(echo_distance)
                .collect();
            serde_json::json!({"success": true, "results": results}).to_string().into_bytes()
        })
        .create_async()
        .await;

    let script = predictor_script("exit 1");
    let client = client(&script);
    let options = options(&server.url());
    let vectors = vectors();

    let batch = client.predict_batch(&vectors, &options).await;
    let mut singles = Vec::new();
    for vector in &vectors {
        singles.push(client.predict(vector, &options).await);
    }

    assert_eq!(batch.len(), vectors.len());
    assert_eq!(batch, singles);
}

#[tokio::test]
async fn test_failed_batch_degrades_to_singles_in_order() {
    let mut server = mockito::Server::new_async().await;
    let batch_mock = server
        .mock("POST", "/predict/batch")
        .with_status(500)
        .create_async()
        .await;
    let single_mock = server
        .mock("POST", "/predict")
        .match_body(Matcher::Regex("distanceScore".to_string()))
        .with_status(200)
        .with_body_from_request(|request| {
            let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
            echo_distance(&body["features"]).to_string().into_bytes()
        })
        .expect(3)
        .create_async()
        .await;

    let script = predictor_script("exit 1");
    let client = client(&script);
    let vectors = vectors();

    let results = client.predict_batch(&vectors, &options(&server.url())).await;

    let expected: Vec<f64> = vectors.iter().map(|v| v.distance_score().value()).collect();
    let actual: Vec<f64> = results.iter().map(|r| r.score().unwrap().value()).collect();
    assert_eq!(actual, expected);
    batch_mock.assert_async().await;
    single_mock.assert_async().await;
}

#[tokio::test]
async fn test_spawn_only_path_serializes_through_queue() {
    let script = predictor_script(r#"sleep 0.05; echo '{"success": true, "score": 0.5}'"#);
    let client = Arc::new(client(&script));
    let options = PredictOptions {
        use_http_api: false,
        ..Default::default()
    };
    let vectors = vectors();

    let results = futures::future::join_all(vectors.iter().map(|v| client.predict(v, &options))).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_success()));
}

fn app_state(sink: Arc<MemorySink>) -> AppState {
    let settings = Settings {
        prediction: PredictionSettings {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let client = PredictionClient::new(settings.prediction.clone()).unwrap();
    let (events, _writer) = MatchEventLogger::spawn(sink);

    AppState {
        scorer: CompatibilityScorer::new(Arc::new(client)),
        events,
        settings: Arc::new(settings),
    }
}

#[actix_web::test]
async fn test_extract_endpoint() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(Arc::new(MemorySink::default()))))
            .configure(routes::configure_routes),
    )
    .await;

    let user = traveler("u1", 15.2993, 74.1240, 18_000.0);
    let req = test::TestRequest::post()
        .uri("/api/v1/features/extract")
        .set_json(serde_json::json!({"user": user, "candidate": user}))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["valid"], true);
    assert_eq!(body["features"]["matchType"], "solo_solo");
    assert_eq!(body["features"]["distanceScore"], 1.0);
    assert!(body["features"].get("groupSizeScore").is_none());
}

#[actix_web::test]
async fn test_extract_endpoint_rejects_two_targets() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(Arc::new(MemorySink::default()))))
            .configure(routes::configure_routes),
    )
    .await;

    let user = traveler("u1", 15.2993, 74.1240, 18_000.0);
    let req = test::TestRequest::post()
        .uri("/api/v1/features/extract")
        .set_json(serde_json::json!({"user": user, "candidate": user, "group": {"size": 3}}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_disabled_scoring_returns_null_score() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(Arc::new(MemorySink::default()))))
            .configure(routes::configure_routes),
    )
    .await;

    let user = traveler("u1", 15.2993, 74.1240, 18_000.0);
    let req = test::TestRequest::post()
        .uri("/api/v1/compatibility/solo")
        .set_json(serde_json::json!({"user": user, "candidate": user}))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert!(body["score"].is_null());
    assert_eq!(body["error"], "ML scoring is disabled");
}

#[actix_web::test]
async fn test_record_event_endpoint() {
    let sink = Arc::new(MemorySink::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(sink.clone())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .set_json(serde_json::json!({
            "features": {"matchType": "solo_group", "distanceScore": 0.95, "groupSizeScore": 1.0},
            "outcome": "chat",
            "source": "rule-based"
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["label"], 1);

    // Let the background writer drain
    for _ in 0..50 {
        if !sink.lines().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    let event: MatchEventLog = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(event.preset, "balanced");
    assert_eq!(event.features.group_size_score().map(|s| s.value()), Some(1.0));
}
