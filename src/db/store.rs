use super::actor::{self, CollectionHandle};
use super::collection::{Briefings, Crew, Positions, Tles};
use super::metadata::MetadataStore;
use super::schema::SQLITE_INIT;
use crate::error::OrbitError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

/// Connection options parsed but not yet used.
///
/// Splitting construction from [`open`](PendingStore::open) keeps IO out of
/// constructors; nothing touches the disk until `open` is awaited.
#[derive(Debug, Clone)]
pub struct PendingStore {
    options: SqliteConnectOptions,
}

/// The opened store: one actor per collection plus direct metadata access.
#[derive(Clone)]
pub struct RecordStore {
    pub positions: CollectionHandle<Positions>,
    pub crew: CollectionHandle<Crew>,
    pub tles: CollectionHandle<Tles>,
    pub briefings: CollectionHandle<Briefings>,
    pub metadata: MetadataStore,
    pool: SqlitePool,
}

impl RecordStore {
    pub fn create(database_url: &str) -> Result<PendingStore, OrbitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        Ok(PendingStore { options })
    }

    /// Stop the collection actors and close the pool.
    pub async fn close(&self) {
        self.positions.stop();
        self.crew.stop();
        self.tles.stop();
        self.briefings.stop();
        self.pool.close().await;
    }
}

impl PendingStore {
    pub async fn open(self) -> Result<RecordStore, OrbitError> {
        let pool = SqlitePoolOptions::new()
            .connect_with(self.options)
            .await?;

        apply_schema(&pool).await?;

        let (positions, crew, tles, briefings) = futures::try_join!(
            actor::spawn::<Positions>(pool.clone()),
            actor::spawn::<Crew>(pool.clone()),
            actor::spawn::<Tles>(pool.clone()),
            actor::spawn::<Briefings>(pool.clone()),
        )?;

        info!("RecordStore opened");
        Ok(RecordStore {
            positions,
            crew,
            tles,
            briefings,
            metadata: MetadataStore::new(pool.clone()),
            pool,
        })
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), OrbitError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
