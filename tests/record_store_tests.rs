use orbitcache::RecordStore;
use orbitcache::db::{Direction, Op, PositionField, PositionPatch};
use orbitcache_schema::{CrewRecord, PositionRecord, TleRecord, TleSource};
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_database(tag: &str) -> (String, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "orbitcache-store-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    (format!("sqlite:{}", path.display()), path)
}

fn remove_database(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

async fn open_store(tag: &str) -> (RecordStore, PathBuf) {
    let (url, path) = temp_database(tag);
    let store = RecordStore::create(&url)
        .expect("options parse")
        .open()
        .await
        .expect("store opens");
    (store, path)
}

fn position(ts: i64) -> PositionRecord {
    PositionRecord::observed(ts, 10.0, 20.0, 415.0, 27_600.0, "daylight")
}

fn crew(name: &str, fetched_at: i64) -> CrewRecord {
    CrewRecord {
        id: CrewRecord::slug(name),
        name: name.to_string(),
        craft: "ISS".to_string(),
        image: None,
        role: None,
        agency: None,
        launch_date: None,
        end_date: None,
        fetched_at,
    }
}

#[tokio::test]
async fn create_does_no_io_until_open() {
    let (url, path) = temp_database("lazy");
    let pending = RecordStore::create(&url).expect("options parse");
    assert!(!path.exists(), "create must not touch the disk");

    let store = pending.open().await.expect("store opens");
    assert!(path.exists());

    let meta = store.metadata.get().await.expect("metadata row seeded");
    assert_eq!(meta.id, 1);
    assert!(meta.initialized);
    assert_eq!(meta.schema_version, 1);
    assert_eq!(meta.position_count, Some(0));
    assert!(meta.last_fetch_at.is_none());

    store.close().await;
    remove_database(&path);
}

#[tokio::test]
async fn insert_is_an_idempotent_upsert() {
    let (store, path) = open_store("upsert").await;

    assert!(store.positions.insert(position(100)).await.unwrap());
    assert!(!store.positions.insert(position(100)).await.unwrap());

    let mut moved = position(100);
    moved.latitude = -5.5;
    assert!(!store.positions.insert(moved).await.unwrap());

    assert_eq!(store.positions.count().await.unwrap(), 1);
    let stored = store.positions.get("pos-100").await.unwrap().expect("present");
    assert_eq!(stored.latitude, -5.5);

    let meta = store.metadata.get().await.unwrap();
    assert_eq!(meta.position_count, Some(1));

    store.close().await;
    remove_database(&path);
}

#[tokio::test]
async fn range_queries_are_inclusive_and_ascending() {
    let (store, path) = open_store("range").await;

    let mut samples: Vec<_> = (0..10).map(|i| position(i * 5)).collect();
    samples.reverse();
    assert_eq!(store.positions.bulk_insert(samples).await.unwrap(), 10);

    let hits = store
        .positions
        .query()
        .between(PositionField::Timestamp, 10_i64, 30_i64)
        .execute()
        .await
        .unwrap();
    let stamps: Vec<i64> = hits.iter().map(|r| r.timestamp_seconds).collect();
    assert_eq!(stamps, vec![10, 15, 20, 25, 30]);

    let newest = store
        .positions
        .query()
        .filter(PositionField::Timestamp, Op::Lt, 40_i64)
        .order_by(PositionField::Timestamp, Direction::Desc)
        .limit(2)
        .execute()
        .await
        .unwrap();
    let stamps: Vec<i64> = newest.iter().map(|r| r.timestamp_seconds).collect();
    assert_eq!(stamps, vec![35, 30]);

    let none = store
        .positions
        .query()
        .filter(PositionField::Timestamp, Op::Gt, 1_000_i64)
        .execute()
        .await
        .expect("an empty match is not an error");
    assert!(none.is_empty());

    assert_eq!(
        store.positions.latest().await.unwrap().map(|r| r.timestamp_seconds),
        Some(45)
    );

    store.close().await;
    remove_database(&path);
}

#[tokio::test]
async fn update_and_delete_adjust_the_position_count() {
    let (store, path) = open_store("mutate").await;

    store
        .positions
        .bulk_insert(vec![position(1), position(2), position(3)])
        .await
        .unwrap();
    assert_eq!(store.metadata.get().await.unwrap().position_count, Some(3));

    let patched = store
        .positions
        .update(
            "pos-2",
            PositionPatch {
                visibility: Some("eclipsed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(patched);
    let rec = store.positions.get("pos-2").await.unwrap().unwrap();
    assert_eq!(rec.visibility, "eclipsed");
    assert_eq!(rec.latitude, 10.0);

    assert!(
        !store
            .positions
            .update("pos-999", PositionPatch::default())
            .await
            .unwrap()
    );

    assert!(store.positions.delete("pos-1").await.unwrap());
    assert!(!store.positions.delete("pos-1").await.unwrap());
    assert!(store.positions.get("pos-1").await.unwrap().is_none());
    assert_eq!(store.metadata.get().await.unwrap().position_count, Some(2));

    store.close().await;
    remove_database(&path);
}

#[tokio::test]
async fn crew_replace_drops_departed_members() {
    let (store, path) = open_store("crew").await;

    store
        .crew
        .replace_all(vec![crew("Ann Alpha", 100), crew("Bob Beta", 100)])
        .await
        .unwrap();
    let size = store
        .crew
        .replace_all(vec![crew("Bob Beta", 200), crew("Cleo Gamma", 200)])
        .await
        .unwrap();
    assert_eq!(size, 2);

    let mut ids: Vec<String> = store
        .crew
        .query()
        .execute()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["bob-beta", "cleo-gamma"]);
    assert!(store.crew.get("ann-alpha").await.unwrap().is_none());

    store.close().await;
    remove_database(&path);
}

#[tokio::test]
async fn latest_tle_is_the_newest_fetch() {
    let (store, path) = open_store("tle").await;

    let line1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    let line2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
    for (at, source) in [
        (300, TleSource::Secondary),
        (100, TleSource::Primary),
        (200, TleSource::Fallback),
    ] {
        store
            .tles
            .insert(TleRecord::new(line1.to_string(), line2.to_string(), at, source))
            .await
            .unwrap();
    }

    let latest = store.tles.latest().await.unwrap().expect("present");
    assert_eq!(latest.id, "tle-300");
    assert_eq!(latest.source, TleSource::Secondary);

    store.close().await;
    remove_database(&path);
}

#[tokio::test]
async fn metadata_tracks_fetch_cleanup_and_migration() {
    let (store, path) = open_store("meta").await;
    let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    store.metadata.record_fetch(at).await.unwrap();
    store.metadata.record_cleanup(at).await.unwrap();
    assert!(!store.metadata.is_migration_complete().await.unwrap());
    store.metadata.mark_migration_complete(at, 2).await.unwrap();

    let meta = store.metadata.get().await.unwrap();
    assert_eq!(meta.last_fetch_at, Some(at));
    assert_eq!(meta.last_cleanup_at, Some(at));
    assert_eq!(meta.migration_completed_at, Some(at));
    assert_eq!(meta.schema_version, 2);
    assert!(store.metadata.is_migration_complete().await.unwrap());

    store.close().await;
    remove_database(&path);
}
