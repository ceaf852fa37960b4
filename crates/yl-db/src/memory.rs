use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use yieldlens_types::{PoolKey, TimeWindow};

use crate::errors::DatabaseError;
use crate::models::{NewPool, NewPoolSnapshot, NewRawIngest, Pool, PoolSnapshot, RawIngest};
use crate::store::{CanonicalStore, CycleBatch, CycleCommit, StoreCounts};

#[derive(Default)]
struct Tables {
    pools: Vec<Pool>,
    pool_ids: HashMap<PoolKey, usize>,
    snapshots: Vec<PoolSnapshot>,
    observations: HashSet<(i64, DateTime<Utc>, String)>,
    series_heads: HashMap<(i64, String), DateTime<Utc>>,
    raw_ingests: Vec<RawIngest>,
    raw_keys: HashSet<(String, String, String)>,
}

impl Tables {
    fn insert_raw(&mut self, raw: NewRawIngest) -> bool {
        let dedupe = (raw.provider.clone(), raw.key.clone(), raw.checksum.clone());
        if !self.raw_keys.insert(dedupe) {
            return false;
        }
        let id = self.raw_ingests.len() as i64 + 1;
        self.raw_ingests.push(RawIngest {
            id,
            provider: raw.provider,
            key: raw.key,
            checksum: raw.checksum,
            payload: raw.payload,
            received_at: raw.received_at,
        });
        true
    }

    fn upsert_pool(&mut self, new_pool: NewPool, now: DateTime<Utc>) -> i64 {
        let key = PoolKey {
            protocol: new_pool.protocol.clone(),
            chain: new_pool.chain.clone(),
            pool_address: new_pool.pool_address.clone(),
        };
        if let Some(&idx) = self.pool_ids.get(&key) {
            let pool = &mut self.pools[idx];
            pool.name = new_pool.name;
            pool.asset_symbols = new_pool.asset_symbols;
            pool.metadata = new_pool.metadata;
            pool.updated_at = now;
            return pool.id;
        }

        let id = self.pools.len() as i64 + 1;
        self.pool_ids.insert(key, self.pools.len());
        self.pools.push(Pool {
            id,
            protocol: new_pool.protocol,
            chain: new_pool.chain,
            pool_address: new_pool.pool_address,
            name: new_pool.name,
            asset_symbols: new_pool.asset_symbols,
            metadata: new_pool.metadata,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn insert_snapshot(&mut self, snapshot: NewPoolSnapshot, now: DateTime<Utc>) -> bool {
        let series = (snapshot.pool_id, snapshot.source.clone());
        if self
            .series_heads
            .get(&series)
            .is_some_and(|head| snapshot.timestamp <= *head)
        {
            return false;
        }
        let observation = (snapshot.pool_id, snapshot.timestamp, snapshot.source.clone());
        if !self.observations.insert(observation) {
            return false;
        }

        self.series_heads.insert(series, snapshot.timestamp);
        let id = self.snapshots.len() as i64 + 1;
        self.snapshots.push(PoolSnapshot {
            id,
            pool_id: snapshot.pool_id,
            timestamp: snapshot.timestamp,
            source: snapshot.source,
            supply_apy: snapshot.supply_apy,
            borrow_apy: snapshot.borrow_apy,
            incentive_apy: snapshot.incentive_apy,
            utilization: snapshot.utilization,
            tvl_usd: snapshot.tvl_usd,
            created_at: now,
        });
        true
    }
}

/// In-process `CanonicalStore`.
///
/// A commit holds the write lock for its whole duration and cannot fail half way, so
/// readers only ever observe fully committed cycles.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CanonicalStore for MemoryStore {
    async fn known_raw(
        &self,
        provider: &str,
        keys: &[String],
    ) -> Result<HashSet<(String, String)>, DatabaseError> {
        let tables = self.tables.read().await;
        let keys: HashSet<&String> = keys.iter().collect();
        Ok(tables
            .raw_ingests
            .iter()
            .filter(|raw| raw.provider == provider && keys.contains(&raw.key))
            .map(|raw| (raw.key.clone(), raw.checksum.clone()))
            .collect())
    }

    async fn commit_cycle(&self, batch: CycleBatch) -> Result<CycleCommit, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut commit = CycleCommit::default();

        for entry in batch.entries {
            if !tables.insert_raw(entry.raw) {
                commit.raw_duplicates += 1;
                continue;
            }
            commit.raw_inserted += 1;

            let Some(records) = entry.records else {
                continue;
            };

            for record in records {
                let pool_id = tables.upsert_pool(NewPool::from(&record.pool), now);
                commit.pool_upserts += 1;
                let inserted =
                    tables.insert_snapshot(NewPoolSnapshot::from_record(pool_id, &record), now);
                commit.record_snapshot(inserted);
            }
        }

        Ok(commit)
    }

    async fn list_pools(&self) -> Result<Vec<Pool>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut pools = tables.pools.clone();
        pools.sort_by_key(Pool::key);
        Ok(pools)
    }

    async fn find_pool(&self, key: &PoolKey) -> Result<Pool, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .pool_ids
            .get(key)
            .map(|&idx| tables.pools[idx].clone())
            .ok_or_else(|| DatabaseError::not_found(format!("find pool by identity: {key}")))
    }

    async fn pool_history(
        &self,
        pool_id: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PoolSnapshot>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut history: Vec<PoolSnapshot> = tables
            .snapshots
            .iter()
            .filter(|s| s.pool_id == pool_id)
            .filter(|s| window.is_none_or(|w| w.contains(s.timestamp)))
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.source.cmp(&b.source))
        });
        Ok(history)
    }

    async fn counts(&self) -> Result<StoreCounts, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(StoreCounts {
            pools: tables.pools.len() as u64,
            snapshots: tables.snapshots.len() as u64,
            raw_ingests: tables.raw_ingests.len() as u64,
        })
    }
}
