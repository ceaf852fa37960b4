use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rust_decimal::{Decimal, dec};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use yieldlens_db::CanonicalStore;
use yieldlens_db::models::{Pool, PoolSnapshot};
use yieldlens_types::{PoolKey, TimeWindow};

use crate::autopilot::{
    AllocationPlan, AutopilotConfig, AutopilotConstraints, ConstraintOverrides, PoolHistory,
    PortfolioSummary, portfolio_series, simulate, summarize,
};
use crate::error::AnalyticsError;
use crate::scoring::{PoolScore, ScoringConfig, score_history};

/// Short enough for a live feed polling several times per second to stay fresh.
pub const LEADERBOARD_TTL: Duration = Duration::from_millis(500);

pub const SIMULATION_INITIAL_VALUE: Decimal = dec!(1000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub pool: PoolKey,
    pub name: String,
    pub asset_symbols: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub supply_apy: Decimal,
    pub borrow_apy: Decimal,
    pub incentive_apy: Decimal,
    pub utilization: Decimal,
    pub tvl_usd: Decimal,
    pub volatility: Decimal,
    pub volatility_samples: usize,
    pub low_confidence: bool,
    pub utilization_spike: bool,
    pub stability_score: Decimal,
    pub risk_adjusted_score: Decimal,
}

impl LeaderboardEntry {
    fn new(pool: &Pool, latest: &PoolSnapshot, score: &PoolScore) -> Self {
        Self {
            pool: pool.key(),
            name: pool.name.clone(),
            asset_symbols: pool.asset_symbols.clone(),
            timestamp: latest.timestamp,
            source: latest.source.clone(),
            supply_apy: latest.supply_apy,
            borrow_apy: latest.borrow_apy,
            incentive_apy: latest.incentive_apy,
            utilization: latest.utilization,
            tvl_usd: latest.tvl_usd,
            volatility: score.volatility.value,
            volatility_samples: score.volatility.samples,
            low_confidence: score.volatility.low_confidence,
            utilization_spike: score.utilization_spike,
            stability_score: score.stability_score,
            risk_adjusted_score: score.risk_adjusted_score,
        }
    }

    pub const fn field(&self, field: LeaderboardField) -> Decimal {
        match field {
            LeaderboardField::SupplyApy => self.supply_apy,
            LeaderboardField::BorrowApy => self.borrow_apy,
            LeaderboardField::IncentiveApy => self.incentive_apy,
            LeaderboardField::Utilization => self.utilization,
            LeaderboardField::TvlUsd => self.tvl_usd,
            LeaderboardField::Volatility => self.volatility,
            LeaderboardField::StabilityScore => self.stability_score,
            LeaderboardField::RiskAdjustedScore => self.risk_adjusted_score,
        }
    }
}

/// Numeric leaderboard columns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardField {
    SupplyApy,
    BorrowApy,
    IncentiveApy,
    Utilization,
    TvlUsd,
    Volatility,
    StabilityScore,
    #[default]
    RiskAdjustedScore,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Sorts by `field`; equal values keep pool identity order.
pub fn sort_leaderboard(
    entries: &mut [LeaderboardEntry],
    field: LeaderboardField,
    order: SortOrder,
) {
    entries.sort_by(|a, b| {
        let ordering = a.field(field).cmp(&b.field(field));
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.pool.cmp(&b.pool))
    });
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolDetail {
    pub pool: PoolKey,
    pub name: String,
    pub asset_symbols: Vec<String>,
    pub metadata: serde_json::Value,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<PoolSnapshot>,
    /// `None` until the pool has at least one snapshot.
    pub score: Option<PoolScore>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub constraints: AutopilotConstraints,
    pub plan: AllocationPlan,
    pub series: Vec<(DateTime<Utc>, Decimal)>,
    pub summary: PortfolioSummary,
}

/// Read-side contracts over committed snapshots. Holds no lock shared with ingestion.
pub struct AnalyticsService {
    store: Arc<dyn CanonicalStore>,
    scoring: ScoringConfig,
    autopilot: AutopilotConfig,
    leaderboard_cache: Cache<(), Arc<Vec<LeaderboardEntry>>>,
}

impl AnalyticsService {
    pub fn new(
        store: Arc<dyn CanonicalStore>,
        scoring: ScoringConfig,
        autopilot: AutopilotConfig,
    ) -> Self {
        Self {
            store,
            scoring,
            autopilot,
            leaderboard_cache: Cache::builder().time_to_live(LEADERBOARD_TTL).build(),
        }
    }

    pub const fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub const fn autopilot(&self) -> &AutopilotConfig {
        &self.autopilot
    }

    /// Latest snapshot and scores of every pool above the default TVL floor whose latest
    /// snapshot is recent enough, best risk-adjusted score first.
    pub async fn leaderboard(&self) -> Result<Arc<Vec<LeaderboardEntry>>, AnalyticsError> {
        if let Some(cached) = self.leaderboard_cache.get(&()).await {
            return Ok(cached);
        }

        let entries = Arc::new(self.compute_leaderboard().await?);
        self.leaderboard_cache.insert((), entries.clone()).await;
        Ok(entries)
    }

    async fn compute_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, AnalyticsError> {
        let pools = self.store.list_pools().await?;
        let mut histories = Vec::with_capacity(pools.len());
        for pool in &pools {
            histories.push((pool, self.store.pool_history(pool.id, None).await?));
        }

        // Freshness is measured against the newest stored snapshot, not the wall clock.
        let as_of = histories
            .iter()
            .filter_map(|(_, history)| history.last().map(|s| s.timestamp))
            .max();
        let mut entries = Vec::with_capacity(pools.len());

        for (pool, history) in &histories {
            let (Some(latest), Some(as_of)) = (history.last(), as_of) else {
                continue;
            };
            if latest.tvl_usd < self.autopilot.min_tvl_usd {
                continue;
            }
            if as_of - latest.timestamp > self.autopilot.max_snapshot_age {
                tracing::debug!(
                    pool = %pool.key(),
                    latest = %latest.timestamp,
                    "[AnalyticsService] Skipping stale pool"
                );
                continue;
            }
            if let Some(score) = score_history(history, &self.scoring)? {
                entries.push(LeaderboardEntry::new(pool, latest, &score));
            }
        }

        entries.sort_by(|a, b| {
            b.risk_adjusted_score
                .cmp(&a.risk_adjusted_score)
                .then_with(|| b.tvl_usd.cmp(&a.tvl_usd))
                .then_with(|| a.pool.cmp(&b.pool))
        });
        tracing::debug!(pools = entries.len(), "[AnalyticsService] Leaderboard refreshed");
        Ok(entries)
    }

    /// Metadata, full history and current scores of one pool.
    pub async fn pool_detail(&self, key: &PoolKey) -> Result<PoolDetail, AnalyticsError> {
        let pool = self.store.find_pool(key).await.map_err(|e| {
            if e.is_not_found() {
                AnalyticsError::PoolNotFound(key.clone())
            } else {
                e.into()
            }
        })?;
        let history = self.store.pool_history(pool.id, None).await?;
        let score = score_history(&history, &self.scoring)?;

        Ok(PoolDetail {
            pool: pool.key(),
            name: pool.name,
            asset_symbols: pool.asset_symbols,
            metadata: pool.metadata,
            first_seen_at: pool.created_at,
            updated_at: pool.updated_at,
            history,
            score,
        })
    }

    /// Runs the autopilot over every stored history.
    pub async fn simulate(
        &self,
        overrides: &ConstraintOverrides,
        window: Option<TimeWindow>,
    ) -> Result<Simulation, AnalyticsError> {
        let constraints = self.autopilot.resolve(overrides)?;

        let pools = self.store.list_pools().await?;
        let mut histories = Vec::with_capacity(pools.len());
        for pool in &pools {
            histories.push(PoolHistory {
                key: pool.key(),
                snapshots: self.store.pool_history(pool.id, None).await?,
            });
        }

        let plan = simulate(&histories, &constraints, &self.scoring, window)?;
        let series = portfolio_series(&plan, &histories, SIMULATION_INITIAL_VALUE)?;
        let summary = summarize(&series, SIMULATION_INITIAL_VALUE)?;

        tracing::debug!(
            steps = plan.steps.len(),
            total_return_pct = %summary.total_return_pct,
            "[AnalyticsService] Simulation done"
        );
        Ok(Simulation {
            constraints,
            plan,
            series,
            summary,
        })
    }
}
