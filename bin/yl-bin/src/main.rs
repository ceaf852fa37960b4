mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use pragma_common::{
    services::{Service, ServiceGroup},
    telemetry::init_telemetry,
};

use yieldlens_api::{ApiService, AppState};
use yieldlens_db::{CanonicalStore, MemoryStore, PgStore, init_pool, run_migrations};
use yieldlens_ingest::{AdminGate, IngestionRunner, Scheduler, SchedulerConfig, SchedulerTask};
use yieldlens_kpi::{AnalyticsService, AutopilotConfig, ScoringConfig, delta_from_secs};
use yieldlens_metrics::MetricsRegistry;
use yieldlens_providers::{ProviderSettings, select_provider};
use yieldlens_types::parse_target_list;

use crate::cli::{AutopilotArgs, LensCli, ProviderArgs, SchedulerArgs, ScoringArgs};

const APP_NAME: &str = "yieldlens";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let LensCli {
        database_url,
        otel_collector_endpoint,
        api_port,
        feed_interval_ms,
        admin_api_token,
        provider,
        scheduler,
        scoring,
        autopilot,
    } = LensCli::parse();

    if let Err(e) = init_telemetry(APP_NAME, otel_collector_endpoint) {
        panic!("Could not init telemetry: {e}");
    }

    let scheduler_config = scheduler_config(scheduler)?;
    scheduler_config.validate()?;
    let scoring_config = scoring_config(scoring);
    scoring_config.validate()?;
    let autopilot_config = autopilot_config(autopilot)?;
    autopilot_config.validate()?;

    let provider = select_provider(&provider_settings(provider))?;
    let store = open_store(database_url.as_deref()).await?;
    let metrics = MetricsRegistry::new();

    let runner = Arc::new(IngestionRunner::new(
        provider,
        store.clone(),
        metrics.ingest.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(runner, scheduler_config)?);
    let admin = Arc::new(AdminGate::new(admin_api_token, scheduler.clone())?);
    let analytics = Arc::new(AnalyticsService::new(
        store,
        scoring_config,
        autopilot_config,
    ));

    let app_state = AppState {
        analytics,
        admin,
        scheduler: scheduler.clone(),
        feed_interval: Duration::from_millis(feed_interval_ms.max(1)),
    };

    let api_service = ApiService::new(app_state, "0.0.0.0", api_port);
    let scheduler_service = SchedulerTask::new(scheduler);

    ServiceGroup::default()
        .with(scheduler_service)
        .with(api_service)
        .start_and_drive_to_end()
        .await?;

    Ok(())
}

async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn CanonicalStore>> {
    match database_url {
        Some(url) => {
            let pool = init_pool(APP_NAME, url)?;
            run_migrations(&pool).await?;
            tracing::info!("Using Postgres canonical store");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn provider_settings(args: ProviderArgs) -> ProviderSettings {
    let defaults = ProviderSettings::default();
    ProviderSettings {
        kind: args.provider,
        dune_api_key: args.dune_api_key,
        dune_query_id: args.dune_query_id,
        dune_base_url: args.dune_base_url.unwrap_or(defaults.dune_base_url),
        allow_mock_fallback: args.allow_mock_fallback,
        mock_step: defaults.mock_step,
    }
}

fn scheduler_config(args: SchedulerArgs) -> Result<SchedulerConfig> {
    let targets = match args.pool_targets.as_deref() {
        Some(raw) => parse_target_list(raw).context("parsing POOL_TARGETS")?,
        None => SchedulerConfig::default().targets,
    };
    Ok(SchedulerConfig {
        tick_interval: Duration::from_secs(args.tick_interval_secs),
        min_fetch_interval: Duration::from_secs(args.min_fetch_interval_secs),
        fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
        initial_lookback: Duration::from_secs(args.initial_lookback_hours * 3_600),
        targets,
    })
}

fn scoring_config(args: ScoringArgs) -> ScoringConfig {
    ScoringConfig {
        a: args.score_a,
        b: args.score_b,
        spike_penalty: args.score_spike_penalty,
        w1: args.score_w1,
        w2: args.score_w2,
        w3: args.score_w3,
        w4: args.score_w4,
        volatility_window: args.volatility_window,
        spike_threshold: args.spike_threshold,
    }
}

fn autopilot_config(args: AutopilotArgs) -> Result<AutopilotConfig> {
    Ok(AutopilotConfig {
        min_tvl_usd: args.autopilot_min_tvl_usd,
        max_weight_per_pool: args.autopilot_max_weight_per_pool,
        cooldown: delta_from_secs("AUTOPILOT_COOLDOWN_SECS", args.autopilot_cooldown_secs)?,
        max_snapshot_age: delta_from_secs(
            "AUTOPILOT_MAX_SNAPSHOT_AGE_SECS",
            args.autopilot_max_snapshot_age_secs,
        )?,
    })
}
