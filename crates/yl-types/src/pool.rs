use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity tuple of a lending pool. Ordering is the stable tie-break used by
/// rankings and allocations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct PoolKey {
    pub protocol: String,
    pub chain: String,
    pub pool_address: String,
}

impl PoolKey {
    pub fn new(
        protocol: impl Into<String>,
        chain: impl Into<String>,
        pool_address: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            chain: chain.into(),
            pool_address: pool_address.into().to_lowercase(),
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.protocol, self.chain, self.pool_address)
    }
}

/// Display metadata that travels with every normalized sighting of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    pub key: PoolKey,
    pub name: String,
    pub asset_symbols: Vec<String>,
    /// Opaque provider-supplied attributes.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Canonical, provider-agnostic observation produced by a normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub pool: PoolDescriptor,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub supply_apy: Decimal,
    pub borrow_apy: Decimal,
    pub incentive_apy: Decimal,
    pub utilization: Decimal,
    pub tvl_usd: Decimal,
}
