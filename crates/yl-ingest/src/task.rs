use std::sync::Arc;

use chrono::Utc;
use pragma_common::services::{Service, ServiceRunner};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::scheduler::{Scheduler, TickReport};

/// Drives `Scheduler::tick` on the fast tick until the service group shuts down.
pub struct SchedulerTask {
    scheduler: Arc<Scheduler>,
}

impl SchedulerTask {
    pub const fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}

async fn run_forever(scheduler: Arc<Scheduler>) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(scheduler.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Ticks are spawned so a slow target never delays the next tick.
    let mut in_flight: JoinSet<TickReport> = JoinSet::new();

    tracing::info!(
        targets = scheduler.targets().len(),
        tick_ms = scheduler.tick_interval().as_millis() as u64,
        "[SchedulerTask] Starting"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let scheduler = Arc::clone(&scheduler);
                in_flight.spawn(async move { scheduler.tick(Utc::now()).await });
            }
            Some(joined) = in_flight.join_next() => match joined {
                Ok(report) if !report.runs.is_empty() => {
                    tracing::debug!(
                        ran = report.runs.len(),
                        not_due = report.not_due,
                        already_running = report.already_running,
                        "[SchedulerTask] Tick finished"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "[SchedulerTask] Tick panicked"),
            },
        }
    }
}

#[async_trait::async_trait]
impl Service for SchedulerTask {
    async fn start<'a>(&mut self, mut runner: ServiceRunner<'a>) -> anyhow::Result<()> {
        let scheduler = Arc::clone(&self.scheduler);

        runner.spawn_loop(move |ctx| async move {
            if let Some(result) = ctx.run_until_cancelled(run_forever(scheduler)).await {
                result?;
            }

            anyhow::Ok(())
        });

        Ok(())
    }
}
