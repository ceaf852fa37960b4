use clap::Parser;
use rust_decimal::Decimal;
use yieldlens_types::ProviderKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct LensCli {
    /// Database URL. The in-memory store is used when unset.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// OTEL collector endpoint
    #[arg(long, env = "OTEL_COLLECTOR_ENDPOINT")]
    pub otel_collector_endpoint: Option<String>,

    /// API port
    #[arg(long, env = "API_PORT", default_value = "8080")]
    pub api_port: u16,

    /// Push period of the live leaderboard feed, in milliseconds
    #[arg(long, env = "FEED_INTERVAL_MS", default_value = "1000")]
    pub feed_interval_ms: u64,

    /// Bearer token required by the manual ingestion trigger
    #[arg(long, env = "ADMIN_API_TOKEN")]
    pub admin_api_token: String,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(flatten)]
    pub scheduler: SchedulerArgs,

    #[command(flatten)]
    pub scoring: ScoringArgs,

    #[command(flatten)]
    pub autopilot: AutopilotArgs,
}

#[derive(clap::Args, Debug)]
pub struct ProviderArgs {
    /// Data provider: mock, dune or thegraph
    #[arg(long, env = "PROVIDER", default_value = "mock")]
    pub provider: ProviderKind,

    #[arg(long, env = "DUNE_API_KEY")]
    pub dune_api_key: Option<String>,

    #[arg(long, env = "DUNE_QUERY_ID")]
    pub dune_query_id: Option<u64>,

    #[arg(long, env = "DUNE_BASE_URL")]
    pub dune_base_url: Option<String>,

    /// Use the mock provider when the selected one lacks credentials
    #[arg(long, env = "ALLOW_MOCK_FALLBACK", default_value_t = false)]
    pub allow_mock_fallback: bool,
}

#[derive(clap::Args, Debug)]
pub struct SchedulerArgs {
    #[arg(long, env = "TICK_INTERVAL_SECS", default_value = "1")]
    pub tick_interval_secs: u64,

    #[arg(long, env = "MIN_FETCH_INTERVAL_SECS", default_value = "60")]
    pub min_fetch_interval_secs: u64,

    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "30")]
    pub fetch_timeout_secs: u64,

    #[arg(long, env = "INITIAL_LOOKBACK_HOURS", default_value = "24")]
    pub initial_lookback_hours: u64,

    /// Comma separated `protocol:chain` list
    #[arg(long, env = "POOL_TARGETS")]
    pub pool_targets: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ScoringArgs {
    #[arg(long, env = "SCORE_A", default_value = "10")]
    pub score_a: Decimal,

    #[arg(long, env = "SCORE_B", default_value = "1")]
    pub score_b: Decimal,

    #[arg(long, env = "SCORE_SPIKE_PENALTY", default_value = "15")]
    pub score_spike_penalty: Decimal,

    #[arg(long, env = "SCORE_W1", default_value = "1")]
    pub score_w1: Decimal,

    #[arg(long, env = "SCORE_W2", default_value = "0.05")]
    pub score_w2: Decimal,

    #[arg(long, env = "SCORE_W3", default_value = "0.5")]
    pub score_w3: Decimal,

    #[arg(long, env = "SCORE_W4", default_value = "0.25")]
    pub score_w4: Decimal,

    #[arg(long, env = "VOLATILITY_WINDOW", default_value = "24")]
    pub volatility_window: usize,

    #[arg(long, env = "SPIKE_THRESHOLD", default_value = "0.05")]
    pub spike_threshold: Decimal,
}

#[derive(clap::Args, Debug)]
pub struct AutopilotArgs {
    #[arg(long, env = "AUTOPILOT_MIN_TVL_USD", default_value = "100000")]
    pub autopilot_min_tvl_usd: Decimal,

    #[arg(long, env = "AUTOPILOT_MAX_WEIGHT_PER_POOL", default_value = "0.4")]
    pub autopilot_max_weight_per_pool: Decimal,

    #[arg(long, env = "AUTOPILOT_COOLDOWN_SECS", default_value = "21600")]
    pub autopilot_cooldown_secs: i64,

    /// Pools without a snapshot this recent are left out of rankings and allocations.
    #[arg(long, env = "AUTOPILOT_MAX_SNAPSHOT_AGE_SECS", default_value = "86400")]
    pub autopilot_max_snapshot_age_secs: i64,
}
