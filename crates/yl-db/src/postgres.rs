use std::collections::HashSet;

use deadpool_diesel::postgres::Pool as DbPool;
use diesel::{Connection, PgConnection, QueryResult};
use yieldlens_types::{PoolKey, TimeWindow};

use crate::errors::DatabaseError;
use crate::models::{NewPool, NewPoolSnapshot, Pool, PoolSnapshot, RawIngest};
use crate::pool::LensPool;
use crate::store::{CanonicalStore, CycleBatch, CycleCommit, StoreCounts};

/// `CanonicalStore` backed by Postgres through diesel.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn apply_batch(batch: CycleBatch, conn: &mut PgConnection) -> QueryResult<CycleCommit> {
    let mut commit = CycleCommit::default();

    for entry in batch.entries {
        if RawIngest::insert_or_ignore(&entry.raw, conn)? == 0 {
            commit.raw_duplicates += 1;
            continue;
        }
        commit.raw_inserted += 1;

        let Some(records) = entry.records else {
            continue;
        };

        for record in records {
            let pool = Pool::upsert(&NewPool::from(&record.pool), conn)?;
            commit.pool_upserts += 1;

            let latest = PoolSnapshot::latest_timestamp(pool.id, &record.source, conn)?;
            if latest.is_some_and(|ts| record.timestamp <= ts) {
                commit.snapshots_skipped += 1;
                continue;
            }

            let new_snapshot = NewPoolSnapshot::from_record(pool.id, &record);
            let inserted = PoolSnapshot::insert_or_ignore(&new_snapshot, conn)?;
            commit.record_snapshot(inserted > 0);
        }
    }

    Ok(commit)
}

#[async_trait::async_trait]
impl CanonicalStore for PgStore {
    async fn known_raw(
        &self,
        provider: &str,
        keys: &[String],
    ) -> Result<HashSet<(String, String)>, DatabaseError> {
        let provider = provider.to_string();
        let keys = keys.to_vec();
        let known = self
            .pool
            .interact_with_context(
                format!("find known raw ingests for provider: {provider}"),
                move |conn| RawIngest::find_known(&provider, &keys, conn),
            )
            .await?;
        Ok(known.into_iter().collect())
    }

    async fn commit_cycle(&self, batch: CycleBatch) -> Result<CycleCommit, DatabaseError> {
        self.pool
            .interact_with_context(
                format!("commit ingestion cycle for provider: {}", batch.provider),
                move |conn| conn.transaction(|conn| apply_batch(batch, conn)),
            )
            .await
    }

    async fn list_pools(&self) -> Result<Vec<Pool>, DatabaseError> {
        self.pool
            .interact_with_context("fetch all pools".to_string(), Pool::find_all)
            .await
    }

    async fn find_pool(&self, key: &PoolKey) -> Result<Pool, DatabaseError> {
        let key = key.clone();
        self.pool
            .interact_with_context(format!("find pool by identity: {key}"), move |conn| {
                Pool::find_by_key(&key, conn)
            })
            .await
    }

    async fn pool_history(
        &self,
        pool_id: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PoolSnapshot>, DatabaseError> {
        self.pool
            .interact_with_context(format!("fetch history for pool: {pool_id}"), move |conn| {
                PoolSnapshot::find_by_pool(pool_id, window, conn)
            })
            .await
    }

    async fn counts(&self) -> Result<StoreCounts, DatabaseError> {
        self.pool
            .interact_with_context("count canonical rows".to_string(), |conn| {
                Ok::<_, diesel::result::Error>(StoreCounts {
                    pools: Pool::count(conn)? as u64,
                    snapshots: PoolSnapshot::count(conn)? as u64,
                    raw_ingests: RawIngest::count(conn)? as u64,
                })
            })
            .await
    }
}
