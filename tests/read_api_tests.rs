use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use orbitcache::config::{RetentionConfig, SyncConfig, UpstreamConfig};
use orbitcache::migration::{MigrationNotice, MigrationResult};
use orbitcache::server::router::{OrbitState, orbit_router};
use orbitcache::upstream::HttpTelemetrySource;
use orbitcache::{RecordStore, RetentionManager, SyncContext, SyncManager, SystemClock};
use orbitcache_gaps::{GapAnalyzer, GapFillingConfig, KeplerPropagator};
use orbitcache_schema::{CrewRecord, PositionRecord};
use serde_json::{Value, json};
use std::{
    fs,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

struct Harness {
    app: Router,
    store: RecordStore,
    sync: SyncManager,
    path: PathBuf,
}

impl Harness {
    async fn new(tag: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "orbitcache-api-{tag}-{}-{}.sqlite",
            std::process::id(),
            nanos
        ));
        let store = RecordStore::create(&format!("sqlite:{}", path.display()))
            .expect("options parse")
            .open()
            .await
            .expect("store opens");

        let clock = Arc::new(SystemClock);
        let retention =
            RetentionManager::new(store.clone(), RetentionConfig::default(), clock.clone());
        // Hour-long timers and no boot fetch: the source is never called.
        let sync = SyncManager::spawn(SyncContext {
            store: store.clone(),
            source: Arc::new(
                HttpTelemetrySource::new(&UpstreamConfig::default()).expect("client builds"),
            ),
            analyzer: GapAnalyzer::new(GapFillingConfig::default(), Arc::new(KeplerPropagator)),
            retention: retention.clone(),
            clock,
            config: SyncConfig {
                position_interval_ms: 3_600_000,
                fetch_on_start: false,
                ..Default::default()
            },
        })
        .await
        .expect("sync manager spawns");

        let notice = MigrationNotice::default();
        notice
            .publish(&MigrationResult {
                success: false,
                error: Some("legacy snapshot unreadable".to_string()),
                ..Default::default()
            })
            .await;

        let app = orbit_router(OrbitState::new(store.clone(), sync.clone(), retention, notice));
        Self {
            app,
            store,
            sync,
            path,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .app
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("request failed");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn close(self) {
        self.sync.shutdown().await;
        self.store.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

fn position(ts: i64) -> PositionRecord {
    PositionRecord::observed(ts, 1.0, 2.0, 415.0, 27_600.0, "eclipsed")
}

#[tokio::test]
async fn positions_range_is_inclusive() {
    let h = Harness::new("range").await;
    h.store
        .positions
        .bulk_insert((0..6).map(|i| position(100 + i * 5)).collect())
        .await
        .unwrap();

    let (status, body) = h.send("GET", "/api/positions?from=105&to=120", None).await;
    assert_eq!(status, StatusCode::OK);
    let stamps: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["timestampSeconds"].as_i64().unwrap())
        .collect();
    assert_eq!(stamps, vec![105, 110, 115, 120]);

    let (status, body) = h
        .send("GET", "/api/positions?order=desc&limit=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "pos-125");
    assert_eq!(body[1]["id"], "pos-120");
    assert_eq!(body[0]["origin"], "observed");

    let (status, body) = h.send("GET", "/api/positions?from=200&to=100", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUERY");

    h.close().await;
}

#[tokio::test]
async fn latest_endpoints_report_missing_data() {
    let h = Harness::new("latest").await;

    let (status, body) = h.send("GET", "/api/positions/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = h.send("GET", "/api/tle/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.store.positions.insert(position(500)).await.unwrap();
    h.store.positions.insert(position(400)).await.unwrap();
    let (status, body) = h.send("GET", "/api/positions/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timestampSeconds"], 500);

    h.close().await;
}

#[tokio::test]
async fn crew_roster_is_sorted_by_name() {
    let h = Harness::new("crew").await;
    let roster = ["Zed Zulu", "Ann Alpha"]
        .into_iter()
        .map(|name| CrewRecord {
            id: CrewRecord::slug(name),
            name: name.to_string(),
            craft: "ISS".to_string(),
            image: None,
            role: Some("Flight Engineer".to_string()),
            agency: None,
            launch_date: None,
            end_date: None,
            fetched_at: 1_700_000_000,
        })
        .collect();
    h.store.crew.replace_all(roster).await.unwrap();

    let (status, body) = h.send("GET", "/api/crew", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Ann Alpha");
    assert_eq!(body[1]["name"], "Zed Zulu");
    assert_eq!(body[0]["role"], "Flight Engineer");
    assert!(body[0].get("image").is_none());

    h.close().await;
}

#[tokio::test]
async fn visibility_drives_pause_and_resume() {
    let h = Harness::new("visibility").await;

    let (status, body) = h
        .send("POST", "/api/visibility", Some(json!({"hidden": true})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    h.sync.start().await.unwrap();
    let (status, body) = h
        .send("POST", "/api/visibility", Some(json!({"hidden": true})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "paused");

    let (status, body) = h
        .send("POST", "/api/visibility", Some(json!({"hidden": false})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "running");

    h.close().await;
}

#[tokio::test]
async fn status_cleanup_and_notice_dismissal() {
    let h = Harness::new("status").await;

    let (status, body) = h.send("GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["schemaVersion"], 1);
    assert_eq!(body["sync"]["state"], "stopped");
    assert_eq!(body["sync"]["tasks"].as_array().unwrap().len(), 4);
    assert_eq!(body["migrationNotice"]["success"], false);

    let (status, body) = h.send("POST", "/api/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["position", "tle", "crew", "briefing"]);

    let (status, _) = h.send("DELETE", "/api/migration/notice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = h.send("GET", "/api/status", None).await;
    assert!(body.get("migrationNotice").is_none());
    assert!(body["metadata"]["lastCleanupAt"].is_string());

    h.close().await;
}

#[tokio::test]
async fn unknown_routes_fall_through_with_request_id() {
    let h = Harness::new("fallback").await;

    let resp = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/nope")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-request-id"], "abc-123");

    h.close().await;
}
