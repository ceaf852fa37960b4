use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use yieldlens_ingest::{IngestResult, TargetRun, TargetState};
use yieldlens_types::IngestTarget;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestTriggerRequest {
    /// `all` or `<protocol>:<chain>`
    #[serde(default = "default_trigger_target")]
    pub target: String,
}

fn default_trigger_target() -> String {
    "all".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestCounts {
    pub fetched: usize,
    pub already_known: usize,
    pub normalization_failures: usize,
    pub raw_inserted: usize,
    pub raw_duplicates: usize,
    pub pool_upserts: usize,
    pub snapshots_inserted: usize,
    pub snapshots_skipped: usize,
}

impl From<&IngestResult> for IngestCounts {
    fn from(result: &IngestResult) -> Self {
        Self {
            fetched: result.fetched,
            already_known: result.already_known,
            normalization_failures: result.normalization_failures,
            raw_inserted: result.raw_inserted,
            raw_duplicates: result.raw_duplicates,
            pool_upserts: result.pool_upserts,
            snapshots_inserted: result.snapshots_inserted,
            snapshots_skipped: result.snapshots_skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestRunItem {
    pub target: String,
    /// completed, rate_limited, failed, timed_out or already_running
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<IngestCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<(IngestTarget, TargetRun)> for IngestRunItem {
    fn from((target, run): (IngestTarget, TargetRun)) -> Self {
        let (outcome, counts, error) = match run {
            TargetRun::Completed(result) => ("completed", Some(IngestCounts::from(&result)), None),
            TargetRun::RateLimited => ("rate_limited", None, None),
            TargetRun::Failed { error } => ("failed", None, Some(error)),
            TargetRun::TimedOut => ("timed_out", None, None),
            TargetRun::AlreadyRunning => ("already_running", None, None),
        };
        Self {
            target: target.id(),
            outcome: outcome.to_string(),
            counts,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestTriggerResponse {
    pub runs: Vec<IngestRunItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TargetStatusItem {
    pub target: String,
    /// idle, due, fetching or cooling
    pub status: String,
    pub last_fetch_at: Option<String>,
    pub last_success_at: Option<String>,
    pub last_outcome: Option<String>,
    pub fetch_count: u64,
}

impl From<(IngestTarget, TargetState)> for TargetStatusItem {
    fn from((target, state): (IngestTarget, TargetState)) -> Self {
        Self {
            target: target.id(),
            status: state.status.as_str().to_string(),
            last_fetch_at: state.last_fetch_at.map(|t| t.to_rfc3339()),
            last_success_at: state.last_success_at.map(|t| t.to_rfc3339()),
            last_outcome: state.last_outcome,
            fetch_count: state.fetch_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestStatusResponse {
    pub targets: Vec<TargetStatusItem>,
}
