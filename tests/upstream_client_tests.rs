use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use orbitcache::config::{FALLBACK_TLE_LINE1, FALLBACK_TLE_LINE2, UpstreamConfig};
use orbitcache::error::OrbitError;
use orbitcache::upstream::{HttpTelemetrySource, TelemetrySource};
use orbitcache_schema::TleSource;
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::net::TcpListener;
use url::Url;

const LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
const LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

#[derive(Clone, Default)]
struct Hits {
    position: Arc<AtomicU64>,
    tle_primary: Arc<AtomicU64>,
    tle_secondary: Arc<AtomicU64>,
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

fn config_for(base: &Url) -> UpstreamConfig {
    UpstreamConfig {
        position_url: base.join("/position").unwrap(),
        crew_url: base.join("/astros.json").unwrap(),
        tle_primary_url: base.join("/tle.txt").unwrap(),
        tle_secondary_url: base.join("/tle.json").unwrap(),
        retry_max_times: 2,
        request_timeout_secs: 5,
        ..Default::default()
    }
}

async fn position_ok(State(hits): State<Hits>) -> impl IntoResponse {
    hits.position.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "name": "iss",
        "id": 25544,
        "latitude": 50.11,
        "longitude": 118.07,
        "altitude": 408.05,
        "velocity": 27621.67,
        "visibility": "daylight",
        "timestamp": 1700000000
    }))
}

async fn position_missing(State(hits): State<Hits>) -> StatusCode {
    hits.position.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

async fn astros() -> impl IntoResponse {
    Json(json!({
        "message": "success",
        "number": 1,
        "people": [{"name": "Ann Alpha", "craft": "ISS"}]
    }))
}

async fn tle_text(State(hits): State<Hits>) -> impl IntoResponse {
    hits.tle_primary.fetch_add(1, Ordering::SeqCst);
    format!("ISS (ZARYA)\n{LINE1}\n{LINE2}\n")
}

async fn tle_down(State(hits): State<Hits>) -> StatusCode {
    hits.tle_primary.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

async fn tle_json(State(hits): State<Hits>) -> impl IntoResponse {
    hits.tle_secondary.fetch_add(1, Ordering::SeqCst);
    Json(json!({"name": "ISS (ZARYA)", "line1": LINE1, "line2": LINE2}))
}

async fn tle_json_garbage(State(hits): State<Hits>) -> impl IntoResponse {
    hits.tle_secondary.fetch_add(1, Ordering::SeqCst);
    Json(json!({"line1": "nope", "line2": "nope"}))
}

#[tokio::test]
async fn position_and_crew_are_returned_raw() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/position", get(position_ok))
        .route("/astros.json", get(astros))
        .with_state(hits.clone());
    let base = spawn_test_server(app).await;
    let source = HttpTelemetrySource::new(&config_for(&base)).expect("client builds");

    let position = source.fetch_position().await.expect("position fetched");
    assert_eq!(position["timestamp"], 1_700_000_000);
    let crew = source.fetch_crew().await.expect("crew fetched");
    assert_eq!(crew["people"][0]["name"], "Ann Alpha");
    assert_eq!(hits.position.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/position", get(position_missing))
        .with_state(hits.clone());
    let base = spawn_test_server(app).await;
    let source = HttpTelemetrySource::new(&config_for(&base)).expect("client builds");

    let err = source.fetch_position().await.unwrap_err();
    assert!(matches!(err, OrbitError::UpstreamStatus(s) if s == StatusCode::NOT_FOUND));
    assert_eq!(hits.position.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn primary_tle_text_is_preferred() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/tle.txt", get(tle_text))
        .route("/tle.json", get(tle_json))
        .with_state(hits.clone());
    let base = spawn_test_server(app).await;
    let source = HttpTelemetrySource::new(&config_for(&base)).expect("client builds");

    let raw = source.fetch_tle().await.expect("tle fetched");
    assert_eq!(raw.source, TleSource::Primary);
    assert!(raw.text.contains(LINE1));
    assert_eq!(hits.tle_secondary.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_primary_is_retried_then_secondary_used() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/tle.txt", get(tle_down))
        .route("/tle.json", get(tle_json))
        .with_state(hits.clone());
    let base = spawn_test_server(app).await;
    let source = HttpTelemetrySource::new(&config_for(&base)).expect("client builds");

    let raw = source.fetch_tle().await.expect("tle fetched");
    assert_eq!(raw.source, TleSource::Secondary);
    assert_eq!(raw.text, format!("{LINE1}\n{LINE2}"));
    // One attempt plus two retries on 503.
    assert_eq!(hits.tle_primary.load(Ordering::SeqCst), 3);
    assert_eq!(hits.tle_secondary.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fallback_set_is_used_when_both_sources_fail() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/tle.txt", get(tle_down))
        .route("/tle.json", get(tle_json_garbage))
        .with_state(hits.clone());
    let base = spawn_test_server(app).await;
    let source = HttpTelemetrySource::new(&config_for(&base)).expect("client builds");

    let raw = source.fetch_tle().await.expect("fallback never fails");
    assert_eq!(raw.source, TleSource::Fallback);
    assert_eq!(raw.text, format!("{FALLBACK_TLE_LINE1}\n{FALLBACK_TLE_LINE2}"));
}
