pub mod autopilot;
pub mod drawdown;
pub mod error;
pub mod metrics;
pub mod scoring;
pub mod service;

pub use autopilot::{
    AllocationPlan, AllocationStep, AutopilotConfig, AutopilotConstraints, ConstraintOverrides,
    PoolHistory, PoolWeight, PortfolioSummary, delta_from_secs, portfolio_series, simulate,
    summarize,
};
pub use drawdown::calculate_max_drawdown;
pub use error::{AnalyticsError, KpiError};
pub use metrics::{Volatility, rolling_volatility, utilization_spike};
pub use scoring::{
    PoolScore, ScoringConfig, risk_adjusted_score, score_history, stability_score,
};
pub use service::{
    AnalyticsService, LeaderboardEntry, LeaderboardField, PoolDetail, Simulation, SortOrder,
    sort_leaderboard,
};
