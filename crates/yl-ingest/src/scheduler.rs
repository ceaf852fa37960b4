use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use yieldlens_metrics::CycleOutcome;
use yieldlens_types::{ConfigError, IngestTarget, TargetSelector, TimeWindow};

use crate::config::SchedulerConfig;
use crate::error::IngestError;
use crate::runner::{IngestResult, IngestionRunner};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    #[default]
    Idle,
    Due,
    Fetching,
    Cooling,
}

impl TargetStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Due => "due",
            Self::Fetching => "fetching",
            Self::Cooling => "cooling",
        }
    }
}

/// Throttle state of one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetState {
    pub status: TargetStatus,
    /// Start of the last provider call, whatever its outcome.
    pub last_fetch_at: Option<DateTime<Utc>>,
    /// Start of the last cycle that committed. Next windows begin here.
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
    pub fetch_count: u64,
}

impl TargetState {
    fn is_due(&self, now: DateTime<Utc>, min_fetch_interval: TimeDelta) -> bool {
        self.last_fetch_at
            .is_none_or(|last| now - last >= min_fetch_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TargetRun {
    Completed(IngestResult),
    /// Provider asked us to back off. Handled like a target that is not due.
    RateLimited,
    Failed { error: String },
    TimedOut,
    /// Another cycle for the target was in flight; nothing was started.
    AlreadyRunning,
}

impl TargetRun {
    const fn outcome(&self) -> Option<CycleOutcome> {
        match self {
            Self::Completed(_) => Some(CycleOutcome::Success),
            Self::RateLimited => Some(CycleOutcome::RateLimited),
            Self::Failed { .. } => Some(CycleOutcome::Failed),
            Self::TimedOut => Some(CycleOutcome::TimedOut),
            Self::AlreadyRunning => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub runs: Vec<(IngestTarget, TargetRun)>,
    pub not_due: usize,
    pub already_running: usize,
}

enum Claim<'a> {
    Claimed(ClaimedTarget<'a>),
    Running,
    NotDue,
}

struct ClaimedTarget<'a> {
    target: IngestTarget,
    window: TimeWindow,
    guard: ClaimGuard<'a>,
}

/// Hands a claimed target back to `Idle` once its pass is over.
///
/// Also runs when the pass is dropped mid-flight (a cancelled trigger, a dropped tick),
/// so a target can never stay `Fetching` without a cycle behind it. A newer claim on the
/// same target is left alone.
struct ClaimGuard<'a> {
    states: &'a DashMap<IngestTarget, TargetState>,
    target: IngestTarget,
    generation: u64,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        let Some(mut state) = self.states.get_mut(&self.target) else {
            return;
        };
        if state.fetch_count != self.generation {
            return;
        }
        match state.status {
            TargetStatus::Fetching => {
                tracing::warn!(
                    target = %self.target,
                    "[Scheduler] Cycle dropped before completion, releasing target"
                );
                state.status = TargetStatus::Idle;
                state.last_outcome = Some("abandoned".to_string());
            }
            TargetStatus::Cooling => state.status = TargetStatus::Idle,
            TargetStatus::Idle | TargetStatus::Due => {}
        }
    }
}

/// Owner of the per-target throttle map and the only entry point into the runner.
///
/// Every status transition of a target happens under its map entry, so a scheduled
/// tick and a manual trigger can never both move the same target to `Fetching`.
pub struct Scheduler {
    runner: Arc<IngestionRunner>,
    config: SchedulerConfig,
    min_fetch_interval: TimeDelta,
    initial_lookback: TimeDelta,
    states: DashMap<IngestTarget, TargetState>,
}

impl Scheduler {
    pub fn new(runner: Arc<IngestionRunner>, config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let min_fetch_interval = TimeDelta::from_std(config.min_fetch_interval)
            .map_err(|e| ConfigError::invalid("MIN_FETCH_INTERVAL_SECS", e.to_string()))?;
        let initial_lookback = TimeDelta::from_std(config.initial_lookback)
            .map_err(|e| ConfigError::invalid("INITIAL_LOOKBACK_HOURS", e.to_string()))?;

        let states = config
            .targets
            .iter()
            .map(|t| (t.clone(), TargetState::default()))
            .collect();

        Ok(Self {
            runner,
            config,
            min_fetch_interval,
            initial_lookback,
            states,
        })
    }

    pub fn targets(&self) -> &[IngestTarget] {
        &self.config.targets
    }

    pub const fn tick_interval(&self) -> Duration {
        self.config.tick_interval
    }

    /// Evaluates every target and runs the due ones in parallel.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let mut claimed = Vec::new();

        for target in &self.config.targets {
            match self.claim(target, now, false) {
                Claim::Claimed(claim) => claimed.push(claim),
                Claim::Running => {
                    tracing::debug!(target = %target, "[Scheduler] Cycle in flight, skipping");
                    report.already_running += 1;
                }
                Claim::NotDue => report.not_due += 1,
            }
        }

        report.runs = self.run_claimed(claimed, now).await;
        report
    }

    /// Manual run that ignores the due gate and the cooling phase of a finished cycle,
    /// but never overlaps an in-flight one.
    pub async fn trigger(
        &self,
        selector: &TargetSelector,
        now: DateTime<Utc>,
    ) -> Result<Vec<(IngestTarget, TargetRun)>, IngestError> {
        let targets = match selector {
            TargetSelector::All => self.config.targets.clone(),
            TargetSelector::One(target) if self.states.contains_key(target) => {
                vec![target.clone()]
            }
            TargetSelector::One(target) => {
                return Err(IngestError::UnknownTarget(target.id()));
            }
        };

        let mut runs = Vec::new();
        let mut claimed = Vec::new();
        for target in targets {
            match self.claim(&target, now, true) {
                Claim::Claimed(claim) => claimed.push(claim),
                Claim::Running => {
                    tracing::info!(
                        target = %target,
                        "[Scheduler] Manual trigger refused, cycle in flight"
                    );
                    runs.push((target, TargetRun::AlreadyRunning));
                }
                // Forced claims only miss targets absent from the map.
                Claim::NotDue => {}
            }
        }

        runs.extend(self.run_claimed(claimed, now).await);
        runs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(runs)
    }

    /// Snapshot of the throttle map, ordered by target.
    pub fn status(&self) -> Vec<(IngestTarget, TargetState)> {
        let mut states: Vec<_> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    fn claim(&self, target: &IngestTarget, now: DateTime<Utc>, force: bool) -> Claim<'_> {
        let Some(mut state) = self.states.get_mut(target) else {
            return Claim::NotDue;
        };

        match state.status {
            TargetStatus::Fetching => return Claim::Running,
            TargetStatus::Idle | TargetStatus::Cooling if force => {
                state.status = TargetStatus::Due;
            }
            TargetStatus::Idle if state.is_due(now, self.min_fetch_interval) => {
                state.status = TargetStatus::Due;
            }
            TargetStatus::Due => {}
            TargetStatus::Idle | TargetStatus::Cooling => return Claim::NotDue,
        }

        let start = state
            .last_success_at
            .unwrap_or(now - self.initial_lookback)
            .min(now);
        state.status = TargetStatus::Fetching;
        state.last_fetch_at = Some(now);
        state.fetch_count += 1;

        Claim::Claimed(ClaimedTarget {
            target: target.clone(),
            window: TimeWindow { start, end: now },
            guard: ClaimGuard {
                states: &self.states,
                target: target.clone(),
                generation: state.fetch_count,
            },
        })
    }

    async fn run_claimed(
        &self,
        claimed: Vec<ClaimedTarget<'_>>,
        now: DateTime<Utc>,
    ) -> Vec<(IngestTarget, TargetRun)> {
        if claimed.is_empty() {
            return Vec::new();
        }

        let runs = join_all(
            claimed
                .iter()
                .map(|claim| self.run_one(&claim.target, claim.window, now)),
        )
        .await;

        // Cooling only lasts until the end of the pass that ran the target; dropping the
        // guards ends it.
        claimed
            .into_iter()
            .map(|ClaimedTarget { target, guard, .. }| {
                drop(guard);
                target
            })
            .zip(runs)
            .collect()
    }

    async fn run_one(
        &self,
        target: &IngestTarget,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> TargetRun {
        let run = match tokio::time::timeout(
            self.config.fetch_timeout,
            self.runner.run_cycle(target, window),
        )
        .await
        {
            Ok(Ok(result)) => TargetRun::Completed(result),
            Ok(Err(e)) if e.is_rate_limited() => {
                tracing::debug!(
                    target = %target,
                    "[Scheduler] Provider rate limited, waiting for next interval"
                );
                TargetRun::RateLimited
            }
            Ok(Err(IngestError::Database(e))) => {
                tracing::error!(target = %target, error = %e, "[Scheduler] Cycle rolled back");
                TargetRun::Failed {
                    error: e.to_string(),
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    target = %target,
                    error = %e,
                    "[Scheduler] Cycle failed, will retry"
                );
                TargetRun::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(
                    target = %target,
                    timeout_secs = self.config.fetch_timeout.as_secs_f64(),
                    "[Scheduler] Cycle timed out, abandoning"
                );
                TargetRun::TimedOut
            }
        };

        if let Some(outcome) = run.outcome() {
            self.runner.metrics().record_cycle(&target.id(), outcome);
        }

        if let Some(mut state) = self.states.get_mut(target) {
            state.status = TargetStatus::Cooling;
            if matches!(run, TargetRun::Completed(_)) {
                state.last_success_at = Some(now);
            }
            state.last_outcome = run.outcome().map(|o| o.as_str().to_string());
        }

        run
    }
}
