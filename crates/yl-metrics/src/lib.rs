use std::sync::Arc;

use opentelemetry::{KeyValue, global, metrics::Counter};

#[derive(Debug)]
pub struct MetricsRegistry {
    pub ingest: Arc<IngestMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ingest: IngestMetrics::new(),
        })
    }
}

#[derive(Debug)]
pub struct IngestMetrics {
    cycles: Counter<u64>,
    raw_inserted: Counter<u64>,
    snapshots_inserted: Counter<u64>,
    normalization_failures: Counter<u64>,
}

impl IngestMetrics {
    pub fn new() -> Arc<Self> {
        let meter = global::meter("yieldlens");
        let cycles = meter
            .u64_counter("ingest_cycles_total")
            .with_description("Number of ingestion cycles run, by target and outcome")
            .with_unit("count")
            .init();

        let raw_inserted = meter
            .u64_counter("raw_ingests_inserted_total")
            .with_description("Number of new raw provider payloads persisted")
            .with_unit("count")
            .init();

        let snapshots_inserted = meter
            .u64_counter("snapshots_inserted_total")
            .with_description("Number of canonical pool snapshots persisted")
            .with_unit("count")
            .init();

        let normalization_failures = meter
            .u64_counter("normalization_failures_total")
            .with_description("Number of raw payloads that could not be normalized")
            .with_unit("count")
            .init();

        Arc::new(Self {
            cycles,
            raw_inserted,
            snapshots_inserted,
            normalization_failures,
        })
    }

    pub fn record_cycle(&self, target: &str, outcome: CycleOutcome) {
        self.cycles.add(
            1,
            &[
                KeyValue::new("target", target.to_string()),
                KeyValue::new("outcome", outcome.as_str().to_string()),
            ],
        );
    }

    pub fn record_commit(&self, provider: &str, raw_inserted: u64, snapshots_inserted: u64) {
        let attributes = [KeyValue::new("provider", provider.to_string())];
        if raw_inserted > 0 {
            self.raw_inserted.add(raw_inserted, &attributes);
        }
        if snapshots_inserted > 0 {
            self.snapshots_inserted.add(snapshots_inserted, &attributes);
        }
    }

    pub fn record_normalization_failure(&self, provider: &str) {
        self.normalization_failures
            .add(1, &[KeyValue::new("provider", provider.to_string())]);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    RateLimited,
    Failed,
    TimedOut,
}

impl CycleOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimited => "rate_limited",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}
