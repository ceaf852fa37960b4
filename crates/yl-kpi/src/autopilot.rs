use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::{Decimal, dec};
use serde::{Deserialize, Serialize};
use yieldlens_db::models::PoolSnapshot;
use yieldlens_types::{ConfigError, PoolKey, TimeWindow};

use crate::drawdown::calculate_max_drawdown;
use crate::error::KpiError;
use crate::scoring::{ScoringConfig, score_history};

const SECONDS_PER_YEAR: i64 = 365 * 24 * 3_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutopilotConstraints {
    pub min_tvl_usd: Decimal,
    /// Upper bound of a single pool's weight, in `(0, 1]`.
    pub max_weight_per_pool: Decimal,
    /// Minimum time an allocation must persist before the pool's weight can change.
    pub cooldown: TimeDelta,
    /// A pool whose latest snapshot is older than this at a step is not a candidate.
    pub max_snapshot_age: TimeDelta,
}

/// Per-invocation overrides. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ConstraintOverrides {
    pub min_tvl_usd: Option<Decimal>,
    pub max_weight_per_pool: Option<Decimal>,
    pub cooldown_secs: Option<i64>,
}

/// Default autopilot constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutopilotConfig {
    pub min_tvl_usd: Decimal,
    pub max_weight_per_pool: Decimal,
    pub cooldown: TimeDelta,
    pub max_snapshot_age: TimeDelta,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            min_tvl_usd: dec!(100000),
            max_weight_per_pool: dec!(0.4),
            cooldown: TimeDelta::hours(6),
            max_snapshot_age: TimeDelta::hours(24),
        }
    }
}

impl AutopilotConfig {
    pub fn defaults(&self) -> AutopilotConstraints {
        AutopilotConstraints {
            min_tvl_usd: self.min_tvl_usd,
            max_weight_per_pool: self.max_weight_per_pool,
            cooldown: self.cooldown,
            max_snapshot_age: self.max_snapshot_age,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults().validate()
    }

    pub fn resolve(
        &self,
        overrides: &ConstraintOverrides,
    ) -> Result<AutopilotConstraints, ConfigError> {
        let cooldown = match overrides.cooldown_secs {
            Some(secs) => delta_from_secs("cooldown_secs", secs)?,
            None => self.cooldown,
        };
        let constraints = AutopilotConstraints {
            min_tvl_usd: overrides.min_tvl_usd.unwrap_or(self.min_tvl_usd),
            max_weight_per_pool: overrides
                .max_weight_per_pool
                .unwrap_or(self.max_weight_per_pool),
            cooldown,
            max_snapshot_age: self.max_snapshot_age,
        };
        constraints.validate()?;
        Ok(constraints)
    }
}

/// Converts a duration setting given in seconds, rejecting values `TimeDelta` cannot hold.
pub fn delta_from_secs(setting: &str, secs: i64) -> Result<TimeDelta, ConfigError> {
    TimeDelta::try_seconds(secs).ok_or_else(|| ConfigError::invalid(setting, "out of range"))
}

impl AutopilotConstraints {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tvl_usd.is_sign_negative() {
            return Err(ConfigError::invalid("min_tvl_usd", "must not be negative"));
        }
        if self.max_weight_per_pool <= Decimal::ZERO || self.max_weight_per_pool > Decimal::ONE {
            return Err(ConfigError::invalid(
                "max_weight_per_pool",
                "must be within (0, 1]",
            ));
        }
        if self.cooldown < TimeDelta::zero() {
            return Err(ConfigError::invalid("cooldown", "must not be negative"));
        }
        if self.max_snapshot_age <= TimeDelta::zero() {
            return Err(ConfigError::invalid("max_snapshot_age", "must be positive"));
        }
        Ok(())
    }
}

/// Ordered snapshot history of one pool.
#[derive(Debug, Clone)]
pub struct PoolHistory {
    pub key: PoolKey,
    pub snapshots: Vec<PoolSnapshot>,
}

impl PoolHistory {
    /// Snapshots observed at or before `at`.
    fn until(&self, at: DateTime<Utc>) -> &[PoolSnapshot] {
        let end = self.snapshots.partition_point(|s| s.timestamp <= at);
        &self.snapshots[..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolWeight {
    pub pool: PoolKey,
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationStep {
    pub timestamp: DateTime<Utc>,
    /// Non-zero weights, ordered by pool identity.
    pub weights: Vec<PoolWeight>,
    pub cash: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub steps: Vec<AllocationStep>,
}

struct Candidate<'a> {
    key: &'a PoolKey,
    score: Decimal,
    tvl_usd: Decimal,
}

/// Replays the histories step by step and allocates greedily by risk-adjusted score.
///
/// Steps are the distinct snapshot timestamps inside `window`. At each step pools under
/// `min_tvl_usd` or without a snapshot in the last `max_snapshot_age` are dropped, pools whose weight changed less than `cooldown` ago keep
/// it, and the remaining capacity goes to the best ranked pools, capped at
/// `max_weight_per_pool` each. Whatever is left is cash.
pub fn simulate(
    histories: &[PoolHistory],
    constraints: &AutopilotConstraints,
    scoring: &ScoringConfig,
    window: Option<TimeWindow>,
) -> Result<AllocationPlan, KpiError> {
    let steps: BTreeSet<DateTime<Utc>> = histories
        .iter()
        .flat_map(|h| h.snapshots.iter().map(|s| s.timestamp))
        .filter(|ts| window.is_none_or(|w| w.contains(*ts)))
        .collect();

    let mut weights: BTreeMap<&PoolKey, Decimal> = BTreeMap::new();
    let mut last_allocation: HashMap<&PoolKey, DateTime<Utc>> = HashMap::new();
    let mut plan = AllocationPlan::default();

    for step in steps {
        let mut candidates = Vec::new();
        for history in histories {
            let seen = history.until(step);
            let Some(latest) = seen.last() else {
                continue;
            };
            if latest.tvl_usd < constraints.min_tvl_usd
                || step - latest.timestamp > constraints.max_snapshot_age
            {
                continue;
            }
            if let Some(score) = score_history(seen, scoring)? {
                candidates.push(Candidate {
                    key: &history.key,
                    score: score.risk_adjusted_score,
                    tvl_usd: latest.tvl_usd,
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.tvl_usd.cmp(&a.tvl_usd))
                .then_with(|| a.key.cmp(b.key))
        });

        let cooling = |key: &PoolKey| {
            last_allocation
                .get(key)
                .is_some_and(|at| step - *at < constraints.cooldown)
        };

        let mut next: BTreeMap<&PoolKey, Decimal> = BTreeMap::new();
        let mut remaining = Decimal::ONE;
        for candidate in candidates.iter().filter(|c| cooling(c.key)) {
            let held = weights.get(candidate.key).copied().unwrap_or_default();
            next.insert(candidate.key, held);
            remaining -= held;
        }
        for candidate in candidates.iter().filter(|c| !cooling(c.key)) {
            let weight = constraints.max_weight_per_pool.min(remaining).max(Decimal::ZERO);
            next.insert(candidate.key, weight);
            remaining -= weight;
        }

        let touched: BTreeSet<&PoolKey> = weights.keys().chain(next.keys()).copied().collect();
        for key in touched {
            let before = weights.get(key).copied().unwrap_or_default();
            let after = next.get(key).copied().unwrap_or_default();
            if before != after {
                last_allocation.insert(key, step);
            }
        }

        next.retain(|_, weight| !weight.is_zero());
        weights = next;

        let allocated: Decimal = weights.values().copied().sum();
        plan.steps.push(AllocationStep {
            timestamp: step,
            weights: weights
                .iter()
                .map(|(key, weight)| PoolWeight {
                    pool: (*key).clone(),
                    weight: *weight,
                })
                .collect(),
            cash: Decimal::ONE - allocated,
        });
    }

    Ok(plan)
}

/// Value of a portfolio following `plan`, starting at `initial_value`.
///
/// Between two steps every allocated pool accrues its supply plus incentive APY, as of
/// the earlier step, pro rata over the elapsed time. Cash earns nothing.
pub fn portfolio_series(
    plan: &AllocationPlan,
    histories: &[PoolHistory],
    initial_value: Decimal,
) -> Result<Vec<(DateTime<Utc>, Decimal)>, KpiError> {
    let by_key: HashMap<&PoolKey, &PoolHistory> = histories.iter().map(|h| (&h.key, h)).collect();
    let mut series = Vec::with_capacity(plan.steps.len());
    let mut value = initial_value;

    for (i, step) in plan.steps.iter().enumerate() {
        if let Some(previous) = i.checked_sub(1).map(|p| &plan.steps[p]) {
            let elapsed = Decimal::from((step.timestamp - previous.timestamp).num_seconds());
            let year_fraction = elapsed / Decimal::from(SECONDS_PER_YEAR);
            let apy = previous
                .weights
                .iter()
                .filter_map(|w| {
                    let latest = by_key.get(&w.pool)?.until(previous.timestamp).last()?;
                    Some((w.weight, latest.supply_apy.checked_add(latest.incentive_apy)))
                })
                .try_fold(Decimal::ZERO, |acc, (weight, pool_apy)| {
                    acc.checked_add(weight.checked_mul(pool_apy?)?)
                });
            value = apy
                .and_then(|apy| accrue(value, apy, year_fraction))
                .ok_or_else(|| {
                    KpiError::CalculationError(format!(
                        "Portfolio value overflow at {}",
                        step.timestamp
                    ))
                })?;
        }
        series.push((step.timestamp, value));
    }

    Ok(series)
}

fn accrue(value: Decimal, apy: Decimal, year_fraction: Decimal) -> Option<Decimal> {
    let gain = value
        .checked_mul(apy)?
        .checked_div(Decimal::ONE_HUNDRED)?
        .checked_mul(year_fraction)?;
    value.checked_add(gain)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSummary {
    pub initial_value: Decimal,
    pub final_value: Decimal,
    pub total_return_pct: Decimal,
    pub max_drawdown_pct: Decimal,
}

pub fn summarize(
    series: &[(DateTime<Utc>, Decimal)],
    initial_value: Decimal,
) -> Result<PortfolioSummary, KpiError> {
    let final_value = series.last().map_or(initial_value, |(_, v)| *v);
    let total_return_pct = if initial_value.is_zero() {
        Decimal::ZERO
    } else {
        (final_value - initial_value)
            .checked_div(initial_value)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| KpiError::CalculationError("Total return overflow".to_string()))?
    };

    Ok(PortfolioSummary {
        initial_value,
        final_value: final_value.round_dp(8),
        total_return_pct: total_return_pct.round_dp(8),
        max_drawdown_pct: calculate_max_drawdown(series)?.round_dp(8),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn history(address: &str, hours: i64, supply_apy: Decimal, tvl_usd: Decimal) -> PoolHistory {
        let snapshots = (0..hours)
            .map(|h| PoolSnapshot {
                id: h,
                pool_id: 1,
                timestamp: t(h),
                source: "mock".to_string(),
                supply_apy,
                borrow_apy: dec!(2),
                incentive_apy: Decimal::ZERO,
                utilization: dec!(0.5),
                tvl_usd,
                created_at: t(h),
            })
            .collect();
        PoolHistory {
            key: PoolKey::new("aave-v3", "ethereum", address),
            snapshots,
        }
    }

    fn constraints(max_weight: Decimal, cooldown_hours: i64) -> AutopilotConstraints {
        AutopilotConstraints {
            min_tvl_usd: dec!(100000),
            max_weight_per_pool: max_weight,
            cooldown: TimeDelta::hours(cooldown_hours),
            max_snapshot_age: TimeDelta::hours(24),
        }
    }

    fn weight_of(step: &AllocationStep, address: &str) -> Decimal {
        step.weights
            .iter()
            .find(|w| w.pool.pool_address == address)
            .map_or(Decimal::ZERO, |w| w.weight)
    }

    #[test]
    fn test_greedy_allocation_with_cash() {
        let histories = vec![
            history("0xa", 3, dec!(5), dec!(1000000)),
            history("0xb", 3, dec!(3), dec!(1000000)),
            history("0xc", 3, dec!(9), dec!(50000)),
        ];
        let scoring = ScoringConfig::default();
        let plan = simulate(&histories, &constraints(dec!(0.4), 0), &scoring, None).unwrap();

        assert_eq!(plan.steps.len(), 3);
        for step in &plan.steps {
            assert_eq!(weight_of(step, "0xa"), dec!(0.4));
            assert_eq!(weight_of(step, "0xb"), dec!(0.4));
            assert_eq!(weight_of(step, "0xc"), Decimal::ZERO);
            assert_eq!(step.cash, dec!(0.2));
        }
    }

    #[test]
    fn test_ties_break_on_tvl_then_identity() {
        let histories = vec![
            history("0xb", 1, dec!(5), dec!(1000000)),
            history("0xa", 1, dec!(5), dec!(1000000)),
            history("0xc", 1, dec!(5), dec!(2000000)),
        ];
        let scoring = ScoringConfig::default();
        let plan = simulate(&histories, &constraints(dec!(0.5), 0), &scoring, None).unwrap();

        let step = &plan.steps[0];
        assert_eq!(weight_of(step, "0xc"), dec!(0.5));
        assert_eq!(weight_of(step, "0xa"), dec!(0.5));
        assert_eq!(weight_of(step, "0xb"), Decimal::ZERO);
    }

    #[test]
    fn test_cooldown_holds_weights() {
        // 0xb appears at hour 2 with a better score than 0xa.
        let a = history("0xa", 8, dec!(4), dec!(1000000));
        let mut b = history("0xb", 8, dec!(9), dec!(1000000));
        b.snapshots.drain(..2);
        let histories = vec![a, b];

        let scoring = ScoringConfig::default();
        let plan = simulate(&histories, &constraints(dec!(1), 4), &scoring, None).unwrap();

        // 0xa takes everything at hour 0 and keeps it until the cooldown expires.
        for step in &plan.steps[..4] {
            assert_eq!(weight_of(step, "0xa"), dec!(1));
            assert_eq!(weight_of(step, "0xb"), Decimal::ZERO);
        }
        // Once it expires the better scored pool takes over.
        let step = &plan.steps[4];
        assert_eq!(weight_of(step, "0xa"), Decimal::ZERO);
        assert_eq!(weight_of(step, "0xb"), dec!(1));
        assert_eq!(step.cash, Decimal::ZERO);
    }

    #[test]
    fn test_simulation_is_replayable() {
        let histories = vec![
            history("0xa", 24, dec!(4), dec!(1000000)),
            history("0xb", 24, dec!(6), dec!(300000)),
        ];
        let c = constraints(dec!(0.6), 3);
        let scoring = ScoringConfig::default();
        let first = simulate(&histories, &c, &scoring, None).unwrap();
        assert_eq!(simulate(&histories, &c, &scoring, None).unwrap(), first);

        let window = TimeWindow::new(t(10), t(12)).unwrap();
        assert_eq!(simulate(&histories, &c, &scoring, Some(window)).unwrap().steps.len(), 3);
    }

    #[test]
    fn test_stale_pool_is_dropped() {
        // 0xb pays more but stops reporting after hour 1.
        let a = history("0xa", 30, dec!(4), dec!(1000000));
        let b = history("0xb", 2, dec!(9), dec!(1000000));
        let histories = vec![a, b];
        let c = AutopilotConstraints {
            max_snapshot_age: TimeDelta::hours(6),
            ..constraints(dec!(1), 0)
        };

        let plan = simulate(&histories, &c, &ScoringConfig::default(), None).unwrap();
        assert_eq!(weight_of(&plan.steps[1], "0xb"), dec!(1));
        // Hour 7 is the first step where its latest snapshot is more than 6h old.
        assert_eq!(weight_of(&plan.steps[7], "0xb"), dec!(1));
        assert_eq!(weight_of(&plan.steps[8], "0xb"), Decimal::ZERO);
        assert_eq!(weight_of(&plan.steps[8], "0xa"), dec!(1));

        let invalid = AutopilotConstraints {
            max_snapshot_age: TimeDelta::zero(),
            ..c
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_portfolio_accrues_yield() {
        let histories = vec![history("0xa", 2, dec!(10), dec!(1000000))];
        let plan = AllocationPlan {
            steps: vec![
                AllocationStep {
                    timestamp: t(0),
                    weights: vec![PoolWeight {
                        pool: histories[0].key.clone(),
                        weight: dec!(0.5),
                    }],
                    cash: dec!(0.5),
                },
                AllocationStep {
                    timestamp: t(0) + Duration::days(365),
                    weights: vec![],
                    cash: Decimal::ONE,
                },
            ],
        };

        let series = portfolio_series(&plan, &histories, dec!(1000)).unwrap();
        assert_eq!(series[1].1, dec!(1050));

        let summary = summarize(&series, dec!(1000)).unwrap();
        assert_eq!(summary.total_return_pct, dec!(5));
        assert_eq!(summary.max_drawdown_pct, Decimal::ZERO);
    }

    #[test]
    fn test_portfolio_overflow_is_an_error() {
        let histories = vec![history("0xa", 2, Decimal::MAX, dec!(1000000))];
        let plan = AllocationPlan {
            steps: vec![
                AllocationStep {
                    timestamp: t(0),
                    weights: vec![PoolWeight {
                        pool: histories[0].key.clone(),
                        weight: dec!(1),
                    }],
                    cash: Decimal::ZERO,
                },
                AllocationStep {
                    timestamp: t(1),
                    weights: vec![],
                    cash: Decimal::ONE,
                },
            ],
        };

        assert!(matches!(
            portfolio_series(&plan, &histories, dec!(1000)),
            Err(KpiError::CalculationError(_))
        ));
    }

    #[test]
    fn test_resolve_overrides() {
        let config = AutopilotConfig::default();
        let resolved = config
            .resolve(&ConstraintOverrides {
                min_tvl_usd: Some(dec!(5)),
                cooldown_secs: Some(60),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(resolved.min_tvl_usd, dec!(5));
        assert_eq!(resolved.max_weight_per_pool, config.max_weight_per_pool);
        assert_eq!(resolved.cooldown, TimeDelta::seconds(60));

        let invalid = ConstraintOverrides {
            max_weight_per_pool: Some(dec!(1.5)),
            ..Default::default()
        };
        assert!(config.resolve(&invalid).is_err());
    }

    #[test]
    fn test_resolve_rejects_out_of_range_cooldown() {
        let config = AutopilotConfig::default();
        for secs in [i64::MAX, i64::MIN] {
            let overrides = ConstraintOverrides {
                cooldown_secs: Some(secs),
                ..Default::default()
            };
            assert!(config.resolve(&overrides).is_err());
        }
        assert!(delta_from_secs("cooldown_secs", i64::MAX).is_err());
        assert_eq!(delta_from_secs("cooldown_secs", 3_600).unwrap(), TimeDelta::hours(1));
    }
}
