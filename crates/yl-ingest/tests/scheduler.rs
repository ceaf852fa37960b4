mod common;

use std::time::Duration;

use chrono::TimeDelta;
use common::{Behaviour, aave, compound, harness, single_target_config, t0};
use yieldlens_db::CanonicalStore;
use yieldlens_ingest::{AdminGate, IngestError, SchedulerConfig, TargetRun, TargetStatus};
use yieldlens_types::{IngestTarget, TargetSelector};

#[tokio::test]
async fn test_throttle_limits_provider_calls() {
    let h = harness(Behaviour::Normal, single_target_config());

    for second in 0..180 {
        let report = h.scheduler.tick(t0() + TimeDelta::seconds(second)).await;
        assert_eq!(report.already_running, 0);
    }

    assert_eq!(h.provider.fetches(), 3);
    let (_, state) = &h.scheduler.status()[0];
    assert_eq!(state.status, TargetStatus::Idle);
    assert_eq!(state.fetch_count, 3);
    assert_eq!(state.last_fetch_at, Some(t0() + TimeDelta::seconds(120)));
}

#[tokio::test]
async fn test_concurrent_ticks_do_not_overlap() {
    let h = harness(
        Behaviour::Slow(Duration::from_millis(200)),
        single_target_config(),
    );

    let (a, b) = tokio::join!(h.scheduler.tick(t0()), h.scheduler.tick(t0()));

    assert_eq!(h.provider.fetches(), 1);
    assert_eq!(a.runs.len() + b.runs.len(), 1);
    assert_eq!(a.already_running + b.already_running, 1);
}

#[tokio::test]
async fn test_manual_trigger_respects_in_flight_cycle() {
    let h = harness(
        Behaviour::Slow(Duration::from_millis(200)),
        single_target_config(),
    );
    let selector = TargetSelector::One(aave());

    let (report, manual) = tokio::join!(
        h.scheduler.tick(t0()),
        h.scheduler.trigger(&selector, t0())
    );

    assert_eq!(report.runs.len(), 1);
    assert_eq!(manual.unwrap(), vec![(aave(), TargetRun::AlreadyRunning)]);
    assert_eq!(h.provider.fetches(), 1);
}

#[tokio::test]
async fn test_manual_trigger_bypasses_due_gate() {
    let h = harness(Behaviour::Normal, single_target_config());

    h.scheduler.tick(t0()).await;
    let runs = h
        .scheduler
        .trigger(&TargetSelector::All, t0() + TimeDelta::seconds(5))
        .await
        .unwrap();

    assert!(matches!(runs[0].1, TargetRun::Completed(_)));
    assert_eq!(h.provider.fetches(), 2);

    // The manual run counts as the last fetch for the throttle.
    h.scheduler.tick(t0() + TimeDelta::seconds(60)).await;
    assert_eq!(h.provider.fetches(), 2);
}

#[tokio::test]
async fn test_unknown_target_is_rejected() {
    let h = harness(Behaviour::Normal, single_target_config());
    let selector = TargetSelector::One(IngestTarget::new("spark", "gnosis"));

    let err = h.scheduler.trigger(&selector, t0()).await.unwrap_err();
    assert!(matches!(err, IngestError::UnknownTarget(_)));
}

#[tokio::test]
async fn test_timed_out_cycle_returns_to_idle() {
    let config = SchedulerConfig {
        fetch_timeout: Duration::from_millis(50),
        ..single_target_config()
    };
    let h = harness(Behaviour::Slow(Duration::from_secs(5)), config);

    let report = h.scheduler.tick(t0()).await;
    assert_eq!(report.runs, vec![(aave(), TargetRun::TimedOut)]);

    let (_, state) = &h.scheduler.status()[0];
    assert_eq!(state.status, TargetStatus::Idle);
    assert_eq!(state.last_fetch_at, Some(t0()));
    assert_eq!(state.last_success_at, None);
    assert_eq!(h.store.counts().await.unwrap().raw_ingests, 0);
}

#[tokio::test]
async fn test_rate_limit_is_not_an_error() {
    let h = harness(Behaviour::RateLimited, single_target_config());

    let report = h.scheduler.tick(t0()).await;
    assert_eq!(report.runs, vec![(aave(), TargetRun::RateLimited)]);

    // Backs off for a full interval like any other call.
    h.scheduler.tick(t0() + TimeDelta::seconds(30)).await;
    assert_eq!(h.provider.fetches(), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_eligible_tick() {
    let h = harness(Behaviour::Unavailable, single_target_config());

    let report = h.scheduler.tick(t0()).await;
    assert!(matches!(report.runs[0].1, TargetRun::Failed { .. }));

    h.scheduler.tick(t0() + TimeDelta::seconds(59)).await;
    assert_eq!(h.provider.fetches(), 1);
    h.scheduler.tick(t0() + TimeDelta::seconds(60)).await;
    assert_eq!(h.provider.fetches(), 2);
}

#[tokio::test]
async fn test_invalid_admin_credential_never_reaches_runner() {
    let h = harness(Behaviour::Normal, single_target_config());
    let gate = AdminGate::new("s3cret", h.scheduler.clone()).unwrap();

    for credential in [None, Some(""), Some("s3cre"), Some("S3CRET")] {
        let err = gate
            .trigger(credential, &TargetSelector::All, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Unauthorized));
    }
    assert_eq!(h.provider.fetches(), 0);
    assert_eq!(h.store.counts().await.unwrap().raw_ingests, 0);

    let runs = gate
        .trigger(Some("s3cret"), &TargetSelector::All, t0())
        .await
        .unwrap();
    assert!(matches!(runs[0].1, TargetRun::Completed(_)));
    assert!(h.store.counts().await.unwrap().raw_ingests > 0);
}

#[test]
fn test_empty_admin_token_is_a_config_error() {
    let h = harness(Behaviour::Normal, single_target_config());
    assert!(AdminGate::new("  ", h.scheduler).is_err());
}

#[tokio::test]
async fn test_cancelled_trigger_releases_target() {
    let h = harness(
        Behaviour::Slow(Duration::from_millis(300)),
        single_target_config(),
    );
    let selector = TargetSelector::One(aave());

    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        h.scheduler.trigger(&selector, t0()),
    )
    .await;
    assert!(cancelled.is_err());

    let (_, state) = &h.scheduler.status()[0];
    assert_eq!(state.status, TargetStatus::Idle);
    assert_eq!(state.last_outcome.as_deref(), Some("abandoned"));

    let report = h.scheduler.tick(t0() + TimeDelta::seconds(60)).await;
    assert_eq!(report.already_running, 0);
    assert!(matches!(report.runs[0].1, TargetRun::Completed(_)));
    assert_eq!(h.provider.fetches(), 2);
}

#[tokio::test]
async fn test_trigger_claims_target_cooling_in_unfinished_pass() {
    let config = SchedulerConfig {
        targets: vec![aave(), compound()],
        ..single_target_config()
    };
    let h = harness(
        Behaviour::SlowFor("compound-v3", Duration::from_millis(300)),
        config,
    );

    let scheduler = h.scheduler.clone();
    let pass = tokio::spawn(async move { scheduler.tick(t0()).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = h.scheduler.status();
    assert_eq!(status[0].0, aave());
    assert_eq!(status[0].1.status, TargetStatus::Cooling);
    assert_eq!(status[1].1.status, TargetStatus::Fetching);

    let runs = h
        .scheduler
        .trigger(&TargetSelector::One(aave()), t0() + TimeDelta::seconds(1))
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert!(matches!(runs[0].1, TargetRun::Completed(_)));

    let report = pass.await.unwrap();
    assert_eq!(report.runs.len(), 2);
    assert_eq!(h.provider.fetches(), 3);
    assert!(
        h.scheduler
            .status()
            .iter()
            .all(|(_, state)| state.status == TargetStatus::Idle)
    );
}
