use yieldlens_types::{IngestTarget, ProviderKind, RawEnvelope, SnapshotRecord, TimeWindow};

use crate::error::{NormalizationError, ProviderError};

/// A source of lending pool metrics.
///
/// `fetch_raw` is the only operation allowed to do I/O. `normalize` must be a pure
/// function of the envelope so that a stored raw payload can always be replayed.
#[async_trait::async_trait]
pub trait PoolDataProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Name stored as `source` on snapshots and as `provider` on raw rows.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    async fn fetch_raw(
        &self,
        targets: &[IngestTarget],
        window: TimeWindow,
    ) -> Result<Vec<RawEnvelope>, ProviderError>;

    fn normalize(&self, envelope: &RawEnvelope) -> Result<Vec<SnapshotRecord>, NormalizationError>;

    /// One result per envelope, in input order.
    fn normalize_all(
        &self,
        envelopes: &[RawEnvelope],
    ) -> Vec<Result<Vec<SnapshotRecord>, NormalizationError>> {
        envelopes.iter().map(|e| self.normalize(e)).collect()
    }
}
