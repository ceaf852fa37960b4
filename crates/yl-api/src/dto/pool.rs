use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use yieldlens_db::models::PoolSnapshot;
use yieldlens_kpi::{LeaderboardEntry, PoolDetail, PoolScore};
use yieldlens_types::PoolKey;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolIdentity {
    pub protocol: String,
    pub chain: String,
    pub pool_address: String,
}

impl From<&PoolKey> for PoolIdentity {
    fn from(key: &PoolKey) -> Self {
        Self {
            protocol: key.protocol.clone(),
            chain: key.chain.clone(),
            pool_address: key.pool_address.clone(),
        }
    }
}

/// One leaderboard row. Decimal values are strings to keep precision.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolListItem {
    pub pool: PoolIdentity,
    pub name: String,
    pub asset_symbols: Vec<String>,
    pub timestamp: String, // RFC3339 timestamp of the latest snapshot
    pub source: String,
    pub supply_apy: String,
    pub borrow_apy: String,
    pub incentive_apy: String,
    pub utilization: String,
    pub tvl_usd: String,
    pub volatility: String,
    pub volatility_samples: usize,
    pub low_confidence: bool,
    pub utilization_spike: bool,
    pub stability_score: String,
    pub risk_adjusted_score: String,
}

impl From<&LeaderboardEntry> for PoolListItem {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            pool: PoolIdentity::from(&entry.pool),
            name: entry.name.clone(),
            asset_symbols: entry.asset_symbols.clone(),
            timestamp: entry.timestamp.to_rfc3339(),
            source: entry.source.clone(),
            supply_apy: entry.supply_apy.to_string(),
            borrow_apy: entry.borrow_apy.to_string(),
            incentive_apy: entry.incentive_apy.to_string(),
            utilization: entry.utilization.to_string(),
            tvl_usd: entry.tvl_usd.to_string(),
            volatility: entry.volatility.to_string(),
            volatility_samples: entry.volatility_samples,
            low_confidence: entry.low_confidence,
            utilization_spike: entry.utilization_spike,
            stability_score: entry.stability_score.to_string(),
            risk_adjusted_score: entry.risk_adjusted_score.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolListResponse {
    pub items: Vec<PoolListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SnapshotPoint {
    pub t: String, // RFC3339 timestamp
    pub source: String,
    pub supply_apy: String,
    pub borrow_apy: String,
    pub incentive_apy: String,
    pub utilization: String,
    pub tvl_usd: String,
}

impl From<&PoolSnapshot> for SnapshotPoint {
    fn from(snapshot: &PoolSnapshot) -> Self {
        Self {
            t: snapshot.timestamp.to_rfc3339(),
            source: snapshot.source.clone(),
            supply_apy: snapshot.supply_apy.to_string(),
            borrow_apy: snapshot.borrow_apy.to_string(),
            incentive_apy: snapshot.incentive_apy.to_string(),
            utilization: snapshot.utilization.to_string(),
            tvl_usd: snapshot.tvl_usd.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolScores {
    pub t: String,
    pub volatility: String,
    pub volatility_samples: usize,
    pub low_confidence: bool,
    pub utilization_spike: bool,
    pub stability_score: String,
    pub risk_adjusted_score: String,
}

impl From<&PoolScore> for PoolScores {
    fn from(score: &PoolScore) -> Self {
        Self {
            t: score.timestamp.to_rfc3339(),
            volatility: score.volatility.value.to_string(),
            volatility_samples: score.volatility.samples,
            low_confidence: score.volatility.low_confidence,
            utilization_spike: score.utilization_spike,
            stability_score: score.stability_score.to_string(),
            risk_adjusted_score: score.risk_adjusted_score.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoolDetailResponse {
    pub pool: PoolIdentity,
    pub name: String,
    pub asset_symbols: Vec<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub first_seen_at: String,
    pub updated_at: String,
    pub history: Vec<SnapshotPoint>,
    /// Absent while the pool has no snapshot yet.
    pub scores: Option<PoolScores>,
}

impl From<PoolDetail> for PoolDetailResponse {
    fn from(detail: PoolDetail) -> Self {
        Self {
            pool: PoolIdentity::from(&detail.pool),
            name: detail.name,
            asset_symbols: detail.asset_symbols,
            metadata: detail.metadata,
            first_seen_at: detail.first_seen_at.to_rfc3339(),
            updated_at: detail.updated_at.to_rfc3339(),
            history: detail.history.iter().map(SnapshotPoint::from).collect(),
            scores: detail.score.as_ref().map(PoolScores::from),
        }
    }
}
