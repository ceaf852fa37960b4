use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::{Decimal, dec};
use yieldlens_db::{CanonicalStore, MemoryStore};
use yieldlens_ingest::IngestionRunner;
use yieldlens_kpi::{
    AnalyticsService, AutopilotConfig, ConstraintOverrides, LeaderboardField, ScoringConfig,
    SortOrder, sort_leaderboard,
};
use yieldlens_metrics::IngestMetrics;
use yieldlens_providers::{MockProvider, PoolDataProvider};
use yieldlens_types::{IngestTarget, TimeWindow};

async fn seeded_service() -> AnalyticsService {
    let store: Arc<dyn CanonicalStore> = Arc::new(MemoryStore::new());
    let provider: Arc<dyn PoolDataProvider> = Arc::new(MockProvider::default());
    let runner = IngestionRunner::new(provider, store.clone(), IngestMetrics::new());

    let end = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let window = TimeWindow::new(end - Duration::hours(12), end).unwrap();
    for target in [
        IngestTarget::new("aave-v3", "ethereum"),
        IngestTarget::new("compound-v3", "ethereum"),
        IngestTarget::new("morpho-blue", "base"),
    ] {
        let result = runner.run_cycle(&target, window).await.unwrap();
        assert_eq!(result.snapshots_inserted, 13);
    }

    let autopilot = AutopilotConfig {
        min_tvl_usd: dec!(100000),
        ..Default::default()
    };
    AnalyticsService::new(store, ScoringConfig::default(), autopilot)
}

#[tokio::test]
async fn test_small_pool_is_excluded_everywhere() {
    let service = seeded_service().await;

    let leaderboard = service.leaderboard().await.unwrap();
    let protocols: Vec<_> = leaderboard.iter().map(|e| e.pool.protocol.as_str()).collect();
    assert_eq!(leaderboard.len(), 2);
    assert!(!protocols.contains(&"morpho-blue"));

    let mut by_tvl = leaderboard.as_ref().clone();
    sort_leaderboard(&mut by_tvl, LeaderboardField::TvlUsd, SortOrder::Desc);
    assert_eq!(by_tvl[0].pool.protocol, "aave-v3");

    let simulation = service
        .simulate(&ConstraintOverrides::default(), None)
        .await
        .unwrap();
    assert_eq!(simulation.plan.steps.len(), 13);
    for step in &simulation.plan.steps {
        assert!(step.weights.iter().all(|w| w.pool.protocol != "morpho-blue"));
        assert!(
            step.weights
                .iter()
                .all(|w| w.weight <= simulation.constraints.max_weight_per_pool)
        );
        let allocated: Decimal = step.weights.iter().map(|w| w.weight).sum();
        assert_eq!(allocated + step.cash, Decimal::ONE);
    }
    assert!(simulation.summary.final_value >= simulation.summary.initial_value);
}

#[tokio::test]
async fn test_simulation_is_replayable_from_storage() {
    let service = seeded_service().await;
    let overrides = ConstraintOverrides {
        cooldown_secs: Some(3 * 3_600),
        ..Default::default()
    };

    let first = service.simulate(&overrides, None).await.unwrap();
    let second = service.simulate(&overrides, None).await.unwrap();
    assert_eq!(first.plan, second.plan);
    assert_eq!(first.summary, second.summary);
}
