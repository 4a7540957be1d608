use super::collection::Collection;
use super::query::{CollectionQuery, QuerySpec};
use crate::error::OrbitError;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::{SqliteConnection, SqlitePool};
use std::marker::PhantomData;
use tracing::{debug, info};

/// Operations accepted by a collection actor. The mailbox is the queue that
/// serializes writers of one table.
#[derive(Debug)]
pub enum CollectionMessage<C: Collection> {
    /// Upsert one record; replies `true` if the key was new.
    Insert(C::Record, RpcReplyPort<Result<bool, OrbitError>>),

    /// Upsert many records in one transaction; replies the number of new keys.
    BulkInsert(Vec<C::Record>, RpcReplyPort<Result<u64, OrbitError>>),

    /// Patch by key; replies `false` if the key does not exist.
    Update(String, C::Patch, RpcReplyPort<Result<bool, OrbitError>>),

    Delete(String, RpcReplyPort<Result<bool, OrbitError>>),

    Get(String, RpcReplyPort<Result<Option<C::Record>, OrbitError>>),

    Query(QuerySpec<C>, RpcReplyPort<Result<Vec<C::Record>, OrbitError>>),

    Count(RpcReplyPort<Result<u64, OrbitError>>),

    /// Record with the greatest order key.
    Latest(RpcReplyPort<Result<Option<C::Record>, OrbitError>>),

    /// Swap the whole table for the given set in one transaction.
    ReplaceAll(Vec<C::Record>, RpcReplyPort<Result<u64, OrbitError>>),

    /// Delete up to `batch` records whose order key is below the cutoff.
    EvictOlderThan(i64, u32, RpcReplyPort<Result<u64, OrbitError>>),

    /// Delete up to `n` records, oldest first.
    EvictOldest(u32, RpcReplyPort<Result<u64, OrbitError>>),
}

/// Cloneable handle to one collection actor.
pub struct CollectionHandle<C: Collection> {
    actor: ActorRef<CollectionMessage<C>>,
}

impl<C: Collection> Clone for CollectionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
        }
    }
}

fn rpc_error<C: Collection>(op: &str, e: impl std::fmt::Display) -> OrbitError {
    OrbitError::Actor(format!("{} {op} RPC failed: {e}", C::NAME))
}

impl<C: Collection> CollectionHandle<C> {
    /// Upsert: an existing key is overwritten.
    pub async fn insert(&self, record: C::Record) -> Result<bool, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Insert, record)
            .map_err(|e| rpc_error::<C>("Insert", e))?
    }

    pub async fn bulk_insert(&self, records: Vec<C::Record>) -> Result<u64, OrbitError> {
        if records.is_empty() {
            return Ok(0);
        }
        ractor::call!(self.actor, CollectionMessage::BulkInsert, records)
            .map_err(|e| rpc_error::<C>("BulkInsert", e))?
    }

    pub async fn update(&self, key: impl Into<String>, patch: C::Patch) -> Result<bool, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Update, key.into(), patch)
            .map_err(|e| rpc_error::<C>("Update", e))?
    }

    pub async fn delete(&self, key: impl Into<String>) -> Result<bool, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Delete, key.into())
            .map_err(|e| rpc_error::<C>("Delete", e))?
    }

    pub async fn get(&self, key: impl Into<String>) -> Result<Option<C::Record>, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Get, key.into())
            .map_err(|e| rpc_error::<C>("Get", e))?
    }

    pub fn query(&self) -> CollectionQuery<C> {
        CollectionQuery::new(self.clone())
    }

    pub(crate) async fn run_query(&self, spec: QuerySpec<C>) -> Result<Vec<C::Record>, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Query, spec)
            .map_err(|e| rpc_error::<C>("Query", e))?
    }

    pub async fn count(&self) -> Result<u64, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Count).map_err(|e| rpc_error::<C>("Count", e))?
    }

    pub async fn latest(&self) -> Result<Option<C::Record>, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::Latest)
            .map_err(|e| rpc_error::<C>("Latest", e))?
    }

    pub async fn replace_all(&self, records: Vec<C::Record>) -> Result<u64, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::ReplaceAll, records)
            .map_err(|e| rpc_error::<C>("ReplaceAll", e))?
    }

    /// Never removes the newest generation (rows sharing the maximum order key).
    pub async fn evict_older_than(&self, cutoff: i64, batch: u32) -> Result<u64, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::EvictOlderThan, cutoff, batch)
            .map_err(|e| rpc_error::<C>("EvictOlderThan", e))?
    }

    /// Never removes the newest generation (rows sharing the maximum order key).
    pub async fn evict_oldest(&self, n: u32) -> Result<u64, OrbitError> {
        ractor::call!(self.actor, CollectionMessage::EvictOldest, n)
            .map_err(|e| rpc_error::<C>("EvictOldest", e))?
    }

    pub(crate) fn stop(&self) {
        self.actor.stop(None);
    }
}

struct CollectionActorState {
    pool: SqlitePool,
}

struct CollectionActor<C>(PhantomData<fn() -> C>);

#[ractor::async_trait]
impl<C: Collection> Actor for CollectionActor<C> {
    type Msg = CollectionMessage<C>;
    type State = CollectionActorState;
    type Arguments = SqlitePool;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        pool: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!(collection = C::NAME, "CollectionActor initialized");
        Ok(CollectionActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            CollectionMessage::Insert(record, reply) => {
                let res = upsert_all::<C>(pool, std::slice::from_ref(&record))
                    .await
                    .map(|created| created > 0);
                let _ = reply.send(res);
            }
            CollectionMessage::BulkInsert(records, reply) => {
                let res = upsert_all::<C>(pool, &records).await;
                let _ = reply.send(res);
            }
            CollectionMessage::Update(key, patch, reply) => {
                let res = update::<C>(pool, &key, &patch).await;
                let _ = reply.send(res);
            }
            CollectionMessage::Delete(key, reply) => {
                let res = delete::<C>(pool, &key).await;
                let _ = reply.send(res);
            }
            CollectionMessage::Get(key, reply) => {
                let res = get::<C>(pool, &key).await;
                let _ = reply.send(res);
            }
            CollectionMessage::Query(spec, reply) => {
                let res = query::<C>(pool, &spec).await;
                let _ = reply.send(res);
            }
            CollectionMessage::Count(reply) => {
                let res = count::<C>(pool).await;
                let _ = reply.send(res);
            }
            CollectionMessage::Latest(reply) => {
                let res = latest::<C>(pool).await;
                let _ = reply.send(res);
            }
            CollectionMessage::ReplaceAll(records, reply) => {
                let res = replace_all::<C>(pool, &records).await;
                let _ = reply.send(res);
            }
            CollectionMessage::EvictOlderThan(cutoff, batch, reply) => {
                let res = evict_older_than::<C>(pool, cutoff, batch).await;
                let _ = reply.send(res);
            }
            CollectionMessage::EvictOldest(n, reply) => {
                let res = evict_oldest::<C>(pool, n).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

/// Keep `storage_metadata.position_count` in step with the net row delta.
async fn adjust_count<C: Collection>(
    conn: &mut SqliteConnection,
    delta: i64,
) -> Result<(), sqlx::Error> {
    if !C::TRACKS_COUNT || delta == 0 {
        return Ok(());
    }
    sqlx::query(
        "UPDATE storage_metadata SET position_count = MAX(0, COALESCE(position_count, 0) + ?) WHERE id = 1",
    )
    .bind(delta)
    .execute(conn)
    .await?;
    Ok(())
}

/// Every write transaction opens with a write statement so SQLite takes the
/// write lock up front (and waits on `busy_timeout`) rather than failing a
/// read-to-write upgrade under WAL.
async fn upsert_all<C: Collection>(
    pool: &SqlitePool,
    records: &[C::Record],
) -> Result<u64, OrbitError> {
    let insert = format!("{} ON CONFLICT(id) DO NOTHING", C::INSERT_SQL);
    let upsert = format!(
        "{} ON CONFLICT(id) DO UPDATE SET {}",
        C::INSERT_SQL,
        C::UPSERT_SET
    );

    let mut tx = pool.begin().await?;
    let mut created: u64 = 0;
    for record in records {
        let fresh = C::bind_record(sqlx::query(&insert), record)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if fresh > 0 {
            created += 1;
        } else {
            C::bind_record(sqlx::query(&upsert), record)
                .execute(&mut *tx)
                .await?;
        }
    }
    adjust_count::<C>(&mut *tx, created as i64).await?;
    tx.commit().await?;

    debug!(
        collection = C::NAME,
        written = records.len(),
        created,
        "upsert committed"
    );
    Ok(created)
}

async fn update<C: Collection>(
    pool: &SqlitePool,
    key: &str,
    patch: &C::Patch,
) -> Result<bool, OrbitError> {
    let affected = C::bind_patch(sqlx::query(C::PATCH_SQL), patch)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();
    debug!(collection = C::NAME, key, affected, "patch applied");
    Ok(affected > 0)
}

async fn delete<C: Collection>(pool: &SqlitePool, key: &str) -> Result<bool, OrbitError> {
    let mut tx = pool.begin().await?;
    let sql = format!("DELETE FROM {} WHERE id = ?", C::TABLE);
    let affected = sqlx::query(&sql).bind(key).execute(&mut *tx).await?.rows_affected();
    adjust_count::<C>(&mut *tx, -(affected as i64)).await?;
    tx.commit().await?;
    Ok(affected > 0)
}

async fn get<C: Collection>(pool: &SqlitePool, key: &str) -> Result<Option<C::Record>, OrbitError> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?", C::COLUMNS, C::TABLE);
    sqlx::query_as::<_, C::Row>(&sql)
        .bind(key)
        .fetch_optional(pool)
        .await?
        .map(C::decode)
        .transpose()
}

async fn query<C: Collection>(
    pool: &SqlitePool,
    spec: &QuerySpec<C>,
) -> Result<Vec<C::Record>, OrbitError> {
    let mut qb = spec.to_sql();
    let rows = qb.build_query_as::<C::Row>().fetch_all(pool).await?;
    rows.into_iter().map(C::decode).collect()
}

async fn count<C: Collection>(pool: &SqlitePool) -> Result<u64, OrbitError> {
    let sql = format!("SELECT COUNT(*) FROM {}", C::TABLE);
    let n: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(n.max(0) as u64)
}

async fn latest<C: Collection>(pool: &SqlitePool) -> Result<Option<C::Record>, OrbitError> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {} DESC, id DESC LIMIT 1",
        C::COLUMNS,
        C::TABLE,
        C::ORDER_KEY
    );
    sqlx::query_as::<_, C::Row>(&sql)
        .fetch_optional(pool)
        .await?
        .map(C::decode)
        .transpose()
}

async fn replace_all<C: Collection>(
    pool: &SqlitePool,
    records: &[C::Record],
) -> Result<u64, OrbitError> {
    let insert = format!(
        "{} ON CONFLICT(id) DO UPDATE SET {}",
        C::INSERT_SQL,
        C::UPSERT_SET
    );
    let mut tx = pool.begin().await?;
    let sql = format!("DELETE FROM {}", C::TABLE);
    let removed = sqlx::query(&sql).execute(&mut *tx).await?.rows_affected();
    for record in records {
        C::bind_record(sqlx::query(&insert), record)
            .execute(&mut *tx)
            .await?;
    }
    // Duplicate keys in `records` collapse, so count what actually landed.
    let sql = format!("SELECT COUNT(*) FROM {}", C::TABLE);
    let landed: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *tx).await?;
    adjust_count::<C>(&mut *tx, landed - removed as i64).await?;
    tx.commit().await?;

    info!(collection = C::NAME, removed, landed, "collection replaced");
    Ok(landed.max(0) as u64)
}

async fn evict_older_than<C: Collection>(
    pool: &SqlitePool,
    cutoff: i64,
    batch: u32,
) -> Result<u64, OrbitError> {
    let sql = format!(
        r#"
        DELETE FROM {t} WHERE id IN (
            SELECT id FROM {t}
            WHERE {k} < ? AND {k} < (SELECT MAX({k}) FROM {t})
            ORDER BY {k} ASC, id ASC
            LIMIT ?
        )
        "#,
        t = C::TABLE,
        k = C::ORDER_KEY
    );
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query(&sql)
        .bind(cutoff)
        .bind(i64::from(batch))
        .execute(&mut *tx)
        .await?
        .rows_affected();
    adjust_count::<C>(&mut *tx, -(deleted as i64)).await?;
    tx.commit().await?;
    Ok(deleted)
}

async fn evict_oldest<C: Collection>(pool: &SqlitePool, n: u32) -> Result<u64, OrbitError> {
    let sql = format!(
        r#"
        DELETE FROM {t} WHERE id IN (
            SELECT id FROM {t}
            WHERE {k} < (SELECT MAX({k}) FROM {t})
            ORDER BY {k} ASC, id ASC
            LIMIT ?
        )
        "#,
        t = C::TABLE,
        k = C::ORDER_KEY
    );
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query(&sql)
        .bind(i64::from(n))
        .execute(&mut *tx)
        .await?
        .rows_affected();
    adjust_count::<C>(&mut *tx, -(deleted as i64)).await?;
    tx.commit().await?;
    Ok(deleted)
}

/// Spawn one actor for collection `C` on a shared pool.
pub(crate) async fn spawn<C: Collection>(pool: SqlitePool) -> Result<CollectionHandle<C>, OrbitError> {
    let (actor, _jh) = Actor::spawn(None, CollectionActor::<C>(PhantomData), pool)
        .await
        .map_err(|e| OrbitError::Actor(format!("{} actor spawn failed: {e}", C::NAME)))?;
    Ok(CollectionHandle { actor })
}
