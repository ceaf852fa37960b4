use yieldlens_types::{IngestTarget, ProviderKind, RawEnvelope, SnapshotRecord, TimeWindow};

use crate::error::{NormalizationError, ProviderError};
use crate::traits::PoolDataProvider;

/// Subgraph integration, not wired yet. Selecting it keeps the pipeline running but every
/// fetch reports the provider as unavailable.
#[derive(Default)]
pub struct TheGraphProvider;

#[async_trait::async_trait]
impl PoolDataProvider for TheGraphProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TheGraph
    }

    async fn fetch_raw(
        &self,
        _targets: &[IngestTarget],
        _window: TimeWindow,
    ) -> Result<Vec<RawEnvelope>, ProviderError> {
        Err(ProviderError::unavailable(
            self.name(),
            "subgraph ingestion is not yet supported",
        ))
    }

    fn normalize(&self, envelope: &RawEnvelope) -> Result<Vec<SnapshotRecord>, NormalizationError> {
        Err(NormalizationError::new(
            self.name(),
            &envelope.key,
            "subgraph payloads are not yet supported",
        ))
    }
}
