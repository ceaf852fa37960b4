use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use yieldlens_db::models::NewRawIngest;
use yieldlens_db::{CanonicalStore, CycleBatch, CycleEntry};
use yieldlens_metrics::IngestMetrics;
use yieldlens_providers::PoolDataProvider;
use yieldlens_types::{IngestTarget, TimeWindow};

use crate::error::IngestError;

/// Row counts of one ingestion cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestResult {
    pub target: String,
    /// Envelopes returned by the provider.
    pub fetched: usize,
    /// Envelopes skipped before normalization because their raw row already exists.
    pub already_known: usize,
    pub normalization_failures: usize,
    pub raw_inserted: usize,
    pub raw_duplicates: usize,
    pub pool_upserts: usize,
    pub snapshots_inserted: usize,
    pub snapshots_skipped: usize,
}

/// Fetch, dedupe, normalize and persist for one target.
pub struct IngestionRunner {
    provider: Arc<dyn PoolDataProvider>,
    store: Arc<dyn CanonicalStore>,
    metrics: Arc<IngestMetrics>,
}

impl IngestionRunner {
    pub fn new(
        provider: Arc<dyn PoolDataProvider>,
        store: Arc<dyn CanonicalStore>,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            provider,
            store,
            metrics,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// Runs one cycle. Safe to retry: a cycle that already landed adds no rows.
    ///
    /// Payloads that fail to normalize keep their raw row and are reported in
    /// `normalization_failures`; the other payloads of the cycle are unaffected.
    pub async fn run_cycle(
        &self,
        target: &IngestTarget,
        window: TimeWindow,
    ) -> Result<IngestResult, IngestError> {
        let provider = self.provider.name().to_string();
        let envelopes = self
            .provider
            .fetch_raw(std::slice::from_ref(target), window)
            .await?;

        let mut result = IngestResult {
            target: target.id(),
            fetched: envelopes.len(),
            ..Default::default()
        };
        if envelopes.is_empty() {
            tracing::debug!(target = %target, "[IngestionRunner] Provider returned no payloads");
            return Ok(result);
        }

        let keys: Vec<String> = envelopes.iter().map(|e| e.key.clone()).collect();
        let known = self.store.known_raw(&provider, &keys).await?;

        let mut seen = HashSet::with_capacity(envelopes.len());
        let mut entries = Vec::with_capacity(envelopes.len());
        for envelope in &envelopes {
            let raw = NewRawIngest::from_envelope(envelope, envelope.checksum());
            let dedupe_key = raw.dedupe_key();
            if known.contains(&dedupe_key) || !seen.insert(dedupe_key) {
                result.already_known += 1;
                continue;
            }

            let records = match self.provider.normalize(envelope) {
                Ok(records) => Some(records),
                Err(e) => {
                    tracing::warn!(
                        target = %target,
                        key = %envelope.key,
                        error = %e,
                        "[IngestionRunner] Keeping raw payload without canonical rows"
                    );
                    self.metrics.record_normalization_failure(&provider);
                    result.normalization_failures += 1;
                    None
                }
            };
            entries.push(CycleEntry { raw, records });
        }

        if entries.is_empty() {
            tracing::debug!(
                target = %target,
                known = result.already_known,
                "[IngestionRunner] Nothing new to persist"
            );
            return Ok(result);
        }

        // Oldest data first so the per-series monotonic rule keeps every new observation.
        entries.sort_by_key(|entry| {
            entry
                .records
                .as_ref()
                .and_then(|records| records.iter().map(|r| r.timestamp).min())
        });

        let commit = self
            .store
            .commit_cycle(CycleBatch {
                provider: provider.clone(),
                entries,
            })
            .await?;

        result.raw_inserted = commit.raw_inserted;
        result.raw_duplicates = commit.raw_duplicates;
        result.pool_upserts = commit.pool_upserts;
        result.snapshots_inserted = commit.snapshots_inserted;
        result.snapshots_skipped = commit.snapshots_skipped;

        self.metrics.record_commit(
            &provider,
            commit.raw_inserted as u64,
            commit.snapshots_inserted as u64,
        );
        tracing::info!(
            target = %target,
            raw_inserted = result.raw_inserted,
            snapshots_inserted = result.snapshots_inserted,
            snapshots_skipped = result.snapshots_skipped,
            normalization_failures = result.normalization_failures,
            "[IngestionRunner] Cycle committed"
        );

        Ok(result)
    }
}
