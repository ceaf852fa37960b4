use chrono::{DateTime, Utc};
use diesel::{prelude::*, upsert::excluded};
use serde::{Deserialize, Serialize};
use yieldlens_types::{PoolDescriptor, PoolKey};

use crate::schema::pools;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = pools)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Pool {
    pub id: i64,
    pub protocol: String,
    pub chain: String,
    pub pool_address: String,
    pub name: String,
    pub asset_symbols: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = pools)]
pub struct NewPool {
    pub protocol: String,
    pub chain: String,
    pub pool_address: String,
    pub name: String,
    pub asset_symbols: Vec<String>,
    pub metadata: serde_json::Value,
}

impl From<&PoolDescriptor> for NewPool {
    fn from(descriptor: &PoolDescriptor) -> Self {
        Self {
            protocol: descriptor.key.protocol.clone(),
            chain: descriptor.key.chain.clone(),
            pool_address: descriptor.key.pool_address.clone(),
            name: descriptor.name.clone(),
            asset_symbols: descriptor.asset_symbols.clone(),
            metadata: serde_json::Value::Object(
                descriptor
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        }
    }
}

impl Pool {
    pub fn key(&self) -> PoolKey {
        PoolKey {
            protocol: self.protocol.clone(),
            chain: self.chain.clone(),
            pool_address: self.pool_address.clone(),
        }
    }

    /// Find all pools, ordered by identity
    pub fn find_all(conn: &mut PgConnection) -> QueryResult<Vec<Self>> {
        pools::table
            .order((pools::protocol, pools::chain, pools::pool_address))
            .select(Self::as_select())
            .load(conn)
    }

    /// Find a pool by its identity tuple
    pub fn find_by_key(key: &PoolKey, conn: &mut PgConnection) -> QueryResult<Self> {
        pools::table
            .filter(pools::protocol.eq(&key.protocol))
            .filter(pools::chain.eq(&key.chain))
            .filter(pools::pool_address.eq(&key.pool_address))
            .select(Self::as_select())
            .first(conn)
    }

    /// Insert a pool, or refresh its display metadata when the identity already exists.
    /// The identity columns are never updated.
    pub fn upsert(new_pool: &NewPool, conn: &mut PgConnection) -> QueryResult<Self> {
        diesel::insert_into(pools::table)
            .values(new_pool)
            .on_conflict((pools::protocol, pools::chain, pools::pool_address))
            .do_update()
            .set((
                pools::name.eq(excluded(pools::name)),
                pools::asset_symbols.eq(excluded(pools::asset_symbols)),
                pools::metadata.eq(excluded(pools::metadata)),
                pools::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)
    }

    pub fn count(conn: &mut PgConnection) -> QueryResult<i64> {
        pools::table.count().get_result(conn)
    }
}
