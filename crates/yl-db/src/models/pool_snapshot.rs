use chrono::{DateTime, Utc};
use diesel::{dsl::max, prelude::*};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use yieldlens_types::{SnapshotRecord, TimeWindow};

use crate::schema::pool_snapshots;

/// Immutable point-in-time observation of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = pool_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PoolSnapshot {
    pub id: i64,
    pub pool_id: i64,
    #[diesel(column_name = observed_at)]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub supply_apy: Decimal,
    pub borrow_apy: Decimal,
    pub incentive_apy: Decimal,
    pub utilization: Decimal,
    pub tvl_usd: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = pool_snapshots)]
pub struct NewPoolSnapshot {
    pub pool_id: i64,
    #[diesel(column_name = observed_at)]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub supply_apy: Decimal,
    pub borrow_apy: Decimal,
    pub incentive_apy: Decimal,
    pub utilization: Decimal,
    pub tvl_usd: Decimal,
}

impl NewPoolSnapshot {
    pub fn from_record(pool_id: i64, record: &SnapshotRecord) -> Self {
        Self {
            pool_id,
            timestamp: record.timestamp,
            source: record.source.clone(),
            supply_apy: record.supply_apy,
            borrow_apy: record.borrow_apy,
            incentive_apy: record.incentive_apy,
            utilization: record.utilization,
            tvl_usd: record.tvl_usd,
        }
    }
}

impl PoolSnapshot {
    /// Full history of a pool, oldest first
    pub fn find_by_pool(
        pool_id: i64,
        window: Option<TimeWindow>,
        conn: &mut PgConnection,
    ) -> QueryResult<Vec<Self>> {
        let mut query = pool_snapshots::table
            .filter(pool_snapshots::pool_id.eq(pool_id))
            .into_boxed();

        if let Some(window) = window {
            query = query
                .filter(pool_snapshots::observed_at.ge(window.start))
                .filter(pool_snapshots::observed_at.le(window.end));
        }

        query
            .order((pool_snapshots::observed_at.asc(), pool_snapshots::source.asc()))
            .select(Self::as_select())
            .load(conn)
    }

    /// Latest stored observation time for one `(pool, source)` series
    pub fn latest_timestamp(
        pool_id: i64,
        source: &str,
        conn: &mut PgConnection,
    ) -> QueryResult<Option<DateTime<Utc>>> {
        pool_snapshots::table
            .filter(pool_snapshots::pool_id.eq(pool_id))
            .filter(pool_snapshots::source.eq(source))
            .select(max(pool_snapshots::observed_at))
            .get_result(conn)
    }

    /// Insert unless the `(pool_id, observed_at, source)` observation already exists.
    /// Returns the number of inserted rows (0 or 1).
    pub fn insert_or_ignore(
        new_snapshot: &NewPoolSnapshot,
        conn: &mut PgConnection,
    ) -> QueryResult<usize> {
        diesel::insert_into(pool_snapshots::table)
            .values(new_snapshot)
            .on_conflict((
                pool_snapshots::pool_id,
                pool_snapshots::observed_at,
                pool_snapshots::source,
            ))
            .do_nothing()
            .execute(conn)
    }

    pub fn count(conn: &mut PgConnection) -> QueryResult<i64> {
        pool_snapshots::table.count().get_result(conn)
    }
}
