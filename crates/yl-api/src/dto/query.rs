use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for the pool leaderboard
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PoolListQuery {
    /// Column to sort by, e.g. `risk_adjusted_score`, `tvl_usd`, `supply_apy`
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub order: Option<String>,
}

/// Query parameters for the allocation simulation. Unset values use the configured
/// defaults.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SimulationQuery {
    pub min_tvl_usd: Option<String>,
    pub max_weight_per_pool: Option<String>,
    pub cooldown_secs: Option<i64>,
    /// RFC3339, inclusive
    pub start: Option<String>,
    /// RFC3339, inclusive
    pub end: Option<String>,
}
