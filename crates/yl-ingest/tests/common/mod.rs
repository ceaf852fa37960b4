#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use yieldlens_db::{CanonicalStore, MemoryStore};
use yieldlens_ingest::{IngestionRunner, Scheduler, SchedulerConfig};
use yieldlens_metrics::IngestMetrics;
use yieldlens_providers::{
    MockProvider, NormalizationError, PoolDataProvider, ProviderError,
};
use yieldlens_types::{IngestTarget, ProviderKind, RawEnvelope, SnapshotRecord, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Normal,
    Slow(Duration),
    /// Slow only for targets of the named protocol.
    SlowFor(&'static str, Duration),
    RateLimited,
    Unavailable,
    /// Adds one payload the normalizer rejects to every fetch.
    WithMalformed,
}

/// Mock provider that counts `fetch_raw` calls and can misbehave on demand.
pub struct TestProvider {
    inner: MockProvider,
    behaviour: Behaviour,
    fetches: AtomicUsize,
}

impl TestProvider {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            inner: MockProvider::default(),
            behaviour,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PoolDataProvider for TestProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn fetch_raw(
        &self,
        targets: &[IngestTarget],
        window: TimeWindow,
    ) -> Result<Vec<RawEnvelope>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Slow(delay) => tokio::time::sleep(delay).await,
            Behaviour::SlowFor(protocol, delay) => {
                if targets.iter().any(|t| t.protocol == protocol) {
                    tokio::time::sleep(delay).await;
                }
            }
            Behaviour::RateLimited => {
                return Err(ProviderError::RateLimited {
                    provider: self.name().to_string(),
                });
            }
            Behaviour::Unavailable => {
                return Err(ProviderError::unavailable(self.name(), "connection refused"));
            }
            Behaviour::Normal | Behaviour::WithMalformed => {}
        }

        let mut envelopes = self.inner.fetch_raw(targets, window).await?;
        if self.behaviour == Behaviour::WithMalformed {
            envelopes.push(RawEnvelope::new(
                self.name(),
                format!("{}:broken", targets[0]),
                serde_json::json!({"unexpected": true}),
                Utc::now(),
            ));
        }
        Ok(envelopes)
    }

    fn normalize(&self, envelope: &RawEnvelope) -> Result<Vec<SnapshotRecord>, NormalizationError> {
        self.inner.normalize(envelope)
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn aave() -> IngestTarget {
    IngestTarget::new("aave-v3", "ethereum")
}

pub fn compound() -> IngestTarget {
    IngestTarget::new("compound-v3", "ethereum")
}

pub struct Harness {
    pub provider: Arc<TestProvider>,
    pub store: Arc<MemoryStore>,
    pub runner: Arc<IngestionRunner>,
    pub scheduler: Arc<Scheduler>,
}

pub fn harness(behaviour: Behaviour, config: SchedulerConfig) -> Harness {
    let provider = TestProvider::new(behaviour);
    let store = Arc::new(MemoryStore::new());
    let runner = Arc::new(IngestionRunner::new(
        provider.clone(),
        store.clone() as Arc<dyn CanonicalStore>,
        IngestMetrics::new(),
    ));
    let scheduler = Arc::new(Scheduler::new(runner.clone(), config).unwrap());
    Harness {
        provider,
        store,
        runner,
        scheduler,
    }
}

pub fn single_target_config() -> SchedulerConfig {
    SchedulerConfig {
        targets: vec![aave()],
        initial_lookback: Duration::from_secs(6 * 3_600),
        ..Default::default()
    }
}
