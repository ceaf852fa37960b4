use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use yieldlens_kpi::{AllocationStep, AutopilotConstraints, PortfolioSummary, Simulation};

use super::{PoolIdentity, TimeseriesPoint};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConstraintsDto {
    pub min_tvl_usd: String,
    pub max_weight_per_pool: String,
    pub cooldown_secs: i64,
    pub max_snapshot_age_secs: i64,
}

impl From<&AutopilotConstraints> for ConstraintsDto {
    fn from(constraints: &AutopilotConstraints) -> Self {
        Self {
            min_tvl_usd: constraints.min_tvl_usd.to_string(),
            max_weight_per_pool: constraints.max_weight_per_pool.to_string(),
            cooldown_secs: constraints.cooldown.num_seconds(),
            max_snapshot_age_secs: constraints.max_snapshot_age.num_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeightDto {
    pub pool: PoolIdentity,
    pub weight: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationStepDto {
    pub t: String,
    pub weights: Vec<WeightDto>,
    pub cash: String,
}

impl From<&AllocationStep> for AllocationStepDto {
    fn from(step: &AllocationStep) -> Self {
        Self {
            t: step.timestamp.to_rfc3339(),
            weights: step
                .weights
                .iter()
                .map(|w| WeightDto {
                    pool: PoolIdentity::from(&w.pool),
                    weight: w.weight.to_string(),
                })
                .collect(),
            cash: step.cash.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryDto {
    pub initial_value: String,
    pub final_value: String,
    pub total_return_pct: String,
    pub max_drawdown_pct: String,
}

impl From<&PortfolioSummary> for SummaryDto {
    fn from(summary: &PortfolioSummary) -> Self {
        Self {
            initial_value: summary.initial_value.to_string(),
            final_value: summary.final_value.to_string(),
            total_return_pct: summary.total_return_pct.to_string(),
            max_drawdown_pct: summary.max_drawdown_pct.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulationResponse {
    pub constraints: ConstraintsDto,
    pub steps: Vec<AllocationStepDto>,
    pub portfolio: Vec<TimeseriesPoint>,
    pub summary: SummaryDto,
}

impl From<&Simulation> for SimulationResponse {
    fn from(simulation: &Simulation) -> Self {
        Self {
            constraints: ConstraintsDto::from(&simulation.constraints),
            steps: simulation
                .plan
                .steps
                .iter()
                .map(AllocationStepDto::from)
                .collect(),
            portfolio: simulation
                .series
                .iter()
                .map(|(t, v)| TimeseriesPoint {
                    t: t.to_rfc3339(),
                    v: v.to_string(),
                })
                .collect(),
            summary: SummaryDto::from(&simulation.summary),
        }
    }
}
