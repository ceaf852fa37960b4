use std::collections::HashSet;

use serde::Serialize;
use yieldlens_types::{PoolKey, SnapshotRecord, TimeWindow};

use crate::errors::DatabaseError;
use crate::models::{NewRawIngest, Pool, PoolSnapshot};

/// One raw provider response plus, when it was normalized, its canonical records.
#[derive(Debug, Clone)]
pub struct CycleEntry {
    pub raw: NewRawIngest,
    /// `None` when normalization failed or was not attempted: only the raw row is kept.
    pub records: Option<Vec<SnapshotRecord>>,
}

/// Everything one ingestion cycle wants to persist. Committed atomically.
#[derive(Debug, Clone)]
pub struct CycleBatch {
    pub provider: String,
    pub entries: Vec<CycleEntry>,
}

/// Row counts produced by a committed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleCommit {
    pub raw_inserted: usize,
    pub raw_duplicates: usize,
    pub pool_upserts: usize,
    pub snapshots_inserted: usize,
    /// Observations already stored, or older than the latest stored one for their series.
    pub snapshots_skipped: usize,
}

impl CycleCommit {
    pub(crate) fn record_snapshot(&mut self, inserted: bool) {
        if inserted {
            self.snapshots_inserted += 1;
        } else {
            self.snapshots_skipped += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub pools: u64,
    pub snapshots: u64,
    pub raw_ingests: u64,
}

/// Storage boundary of the ingestion pipeline.
///
/// Unique-key conflicts are never errors here: raw rows and snapshots are
/// insert-or-ignore, pools are insert-or-merge on their identity tuple.
#[async_trait::async_trait]
pub trait CanonicalStore: Send + Sync {
    /// `(key, checksum)` pairs already persisted for `provider` among `keys`.
    async fn known_raw(
        &self,
        provider: &str,
        keys: &[String],
    ) -> Result<HashSet<(String, String)>, DatabaseError>;

    /// Persist a cycle in a single transaction.
    ///
    /// For every entry the raw row is inserted first; canonical rows are written only
    /// when that insert actually created a row.
    async fn commit_cycle(&self, batch: CycleBatch) -> Result<CycleCommit, DatabaseError>;

    async fn list_pools(&self) -> Result<Vec<Pool>, DatabaseError>;

    /// Unknown identities yield `DatabaseError::NotFound`.
    async fn find_pool(&self, key: &PoolKey) -> Result<Pool, DatabaseError>;

    /// Snapshots of a pool, oldest first.
    async fn pool_history(
        &self,
        pool_id: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PoolSnapshot>, DatabaseError>;

    async fn counts(&self) -> Result<StoreCounts, DatabaseError>;
}
