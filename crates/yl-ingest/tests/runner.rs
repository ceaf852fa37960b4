mod common;

use chrono::Duration;
use common::{Behaviour, aave, harness, single_target_config, t0};
use yieldlens_db::CanonicalStore;
use yieldlens_types::TimeWindow;

#[tokio::test]
async fn test_cycle_is_idempotent() {
    let h = harness(Behaviour::Normal, single_target_config());
    let window = TimeWindow::new(t0() - Duration::hours(5), t0()).unwrap();

    let first = h.runner.run_cycle(&aave(), window).await.unwrap();
    let after_first = h.store.counts().await.unwrap();
    assert_eq!(first.raw_inserted, 6);
    assert_eq!(first.snapshots_inserted, 6);
    assert_eq!(after_first.pools, 1);

    for _ in 0..3 {
        let again = h.runner.run_cycle(&aave(), window).await.unwrap();
        assert_eq!(again.already_known, 6);
        assert_eq!(again.raw_inserted, 0);
        assert_eq!(again.snapshots_inserted, 0);
    }
    assert_eq!(h.store.counts().await.unwrap(), after_first);
}

#[tokio::test]
async fn test_overlapping_windows_only_add_new_buckets() {
    let h = harness(Behaviour::Normal, single_target_config());

    let first = TimeWindow::new(t0() - Duration::hours(3), t0()).unwrap();
    h.runner.run_cycle(&aave(), first).await.unwrap();

    // Received later, covers the last two buckets again plus one new bucket.
    let second = TimeWindow::new(t0() - Duration::hours(1), t0() + Duration::hours(1)).unwrap();
    let result = h.runner.run_cycle(&aave(), second).await.unwrap();
    assert_eq!(result.fetched, 3);
    assert_eq!(result.already_known, 2);
    assert_eq!(result.raw_inserted, 1);
    assert_eq!(result.snapshots_inserted, 1);

    let counts = h.store.counts().await.unwrap();
    assert_eq!(counts.raw_ingests, 5);
    assert_eq!(counts.snapshots, 5);
}

#[tokio::test]
async fn test_normalization_failure_is_isolated() {
    let h = harness(Behaviour::WithMalformed, single_target_config());
    let window = TimeWindow::new(t0() - Duration::hours(2), t0()).unwrap();

    let result = h.runner.run_cycle(&aave(), window).await.unwrap();
    assert_eq!(result.normalization_failures, 1);
    assert_eq!(result.raw_inserted, 4);
    assert_eq!(result.snapshots_inserted, 3);

    let counts = h.store.counts().await.unwrap();
    assert_eq!(counts.raw_ingests, 4);
    assert_eq!(counts.snapshots, 3);

    // The rejected payload is not normalized again on retry.
    let retry = h.runner.run_cycle(&aave(), window).await.unwrap();
    assert_eq!(retry.normalization_failures, 0);
    assert_eq!(retry.already_known, 4);
}

#[tokio::test]
async fn test_provider_error_writes_nothing() {
    let h = harness(Behaviour::Unavailable, single_target_config());
    let window = TimeWindow::new(t0() - Duration::hours(2), t0()).unwrap();

    assert!(h.runner.run_cycle(&aave(), window).await.is_err());
    assert_eq!(h.store.counts().await.unwrap().raw_ingests, 0);
}
