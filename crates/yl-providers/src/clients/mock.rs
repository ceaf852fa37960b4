use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rust_decimal::{Decimal, dec};
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Sha3};
use yieldlens_types::{
    IngestTarget, PoolDescriptor, PoolKey, ProviderKind, RawEnvelope, SnapshotRecord, TimeWindow,
};

use super::check_record;
use crate::error::{NormalizationError, ProviderError};
use crate::traits::PoolDataProvider;

pub const DEFAULT_STEP_SECS: i64 = 3_600;

/// Baseline of a synthetic pool. Every bucket jitters around these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPool {
    pub protocol: String,
    pub chain: String,
    pub pool_address: String,
    pub name: String,
    pub asset_symbols: Vec<String>,
    pub supply_apy: Decimal,
    pub borrow_apy: Decimal,
    pub incentive_apy: Decimal,
    pub utilization: Decimal,
    pub tvl_usd: Decimal,
}

impl SeedPool {
    pub fn key(&self) -> PoolKey {
        PoolKey::new(&self.protocol, &self.chain, &self.pool_address)
    }

    fn serves(&self, target: &IngestTarget) -> bool {
        self.protocol == target.protocol && self.chain == target.chain
    }
}

pub fn default_seeds() -> Vec<SeedPool> {
    vec![
        SeedPool {
            protocol: "aave-v3".to_string(),
            chain: "ethereum".to_string(),
            pool_address: "0x98c23e9d8f34fefb1b7bd6a91b7ff122f4e16f5c".to_string(),
            name: "Aave v3 USDC".to_string(),
            asset_symbols: vec!["USDC".to_string()],
            supply_apy: dec!(4.20),
            borrow_apy: dec!(5.60),
            incentive_apy: dec!(0.35),
            utilization: dec!(0.78),
            tvl_usd: dec!(2000000),
        },
        SeedPool {
            protocol: "compound-v3".to_string(),
            chain: "ethereum".to_string(),
            pool_address: "0xc3d688b66703497daa19211eedff47f25384cdc3".to_string(),
            name: "Compound v3 USDC".to_string(),
            asset_symbols: vec!["USDC".to_string()],
            supply_apy: dec!(5.10),
            borrow_apy: dec!(6.40),
            incentive_apy: dec!(0.80),
            utilization: dec!(0.86),
            tvl_usd: dec!(500000),
        },
        SeedPool {
            protocol: "morpho-blue".to_string(),
            chain: "base".to_string(),
            pool_address: "0x616a4e1db48e22028f6bbf20444cd3b8e3273738".to_string(),
            name: "Morpho Blue WETH/USDC".to_string(),
            asset_symbols: vec!["WETH".to_string(), "USDC".to_string()],
            supply_apy: dec!(9.40),
            borrow_apy: dec!(11.20),
            incentive_apy: dec!(2.10),
            utilization: dec!(0.91),
            tvl_usd: dec!(50000),
        },
    ]
}

#[derive(Debug, Serialize, Deserialize)]
struct MockPayload {
    target: String,
    bucket_start: i64,
    step_secs: i64,
    pools: Vec<MockPoolRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MockPoolRow {
    protocol: String,
    chain: String,
    pool_address: String,
    name: String,
    asset_symbols: Vec<String>,
    supply_apy: Decimal,
    borrow_apy: Decimal,
    incentive_apy: Decimal,
    utilization: Decimal,
    tvl_usd: Decimal,
}

/// Deterministic seed provider.
///
/// Time is cut into buckets of `step`. The values of a bucket only depend on the seed
/// and the bucket start, so re-fetching a bucket yields the same key and checksum.
pub struct MockProvider {
    seeds: Vec<SeedPool>,
    step: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(default_seeds(), Duration::seconds(DEFAULT_STEP_SECS))
    }
}

impl MockProvider {
    pub fn new(seeds: Vec<SeedPool>, step: Duration) -> Self {
        Self {
            seeds,
            step: step.max(Duration::seconds(1)),
        }
    }

    pub fn seeds(&self) -> &[SeedPool] {
        &self.seeds
    }

    /// Start of every bucket overlapping `window`, including the one containing `start`.
    fn bucket_starts(&self, window: TimeWindow) -> Vec<i64> {
        let step = self.step.num_seconds();
        let first = window.start.timestamp().div_euclid(step) * step;
        let last = window.end.timestamp().div_euclid(step) * step;
        std::iter::successors(Some(first), |b| Some(b + step))
            .take_while(|b| *b <= last)
            .collect()
    }

    fn sample(seed: &SeedPool, bucket_start: i64) -> MockPoolRow {
        let mut rng = bucket_rng(seed, bucket_start);

        let supply_apy = (seed.supply_apy + jitter(&mut rng, dec!(0.5))).max(Decimal::ZERO);
        let borrow_apy = (seed.borrow_apy + jitter(&mut rng, dec!(0.6))).max(Decimal::ZERO);
        let incentive_apy = (seed.incentive_apy + jitter(&mut rng, dec!(0.2))).max(Decimal::ZERO);
        let utilization =
            (seed.utilization + jitter(&mut rng, dec!(0.05))).clamp(Decimal::ZERO, Decimal::ONE);
        let tvl_usd = (seed.tvl_usd * (Decimal::ONE + jitter(&mut rng, dec!(0.02)))).round_dp(2);

        MockPoolRow {
            protocol: seed.protocol.clone(),
            chain: seed.chain.clone(),
            pool_address: seed.pool_address.clone(),
            name: seed.name.clone(),
            asset_symbols: seed.asset_symbols.clone(),
            supply_apy,
            borrow_apy,
            incentive_apy,
            utilization,
            tvl_usd,
        }
    }
}

#[async_trait::async_trait]
impl PoolDataProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn fetch_raw(
        &self,
        targets: &[IngestTarget],
        window: TimeWindow,
    ) -> Result<Vec<RawEnvelope>, ProviderError> {
        let received_at = Utc::now();
        let mut envelopes = Vec::new();

        for target in targets {
            let seeds: Vec<&SeedPool> = self.seeds.iter().filter(|s| s.serves(target)).collect();
            if seeds.is_empty() {
                tracing::debug!(target = %target, "[MockProvider] No seed pool for target");
                continue;
            }

            for bucket_start in self.bucket_starts(window) {
                let payload = MockPayload {
                    target: target.id(),
                    bucket_start,
                    step_secs: self.step.num_seconds(),
                    pools: seeds.iter().map(|s| Self::sample(s, bucket_start)).collect(),
                };
                let payload = serde_json::to_value(&payload)
                    .map_err(|e| ProviderError::unavailable(self.name(), e))?;
                envelopes.push(RawEnvelope::new(
                    self.name(),
                    format!("{target}:{bucket_start}"),
                    payload,
                    received_at,
                ));
            }
        }

        Ok(envelopes)
    }

    fn normalize(&self, envelope: &RawEnvelope) -> Result<Vec<SnapshotRecord>, NormalizationError> {
        let err = |reason: String| NormalizationError::new(self.name(), &envelope.key, reason);

        let payload: MockPayload =
            serde_json::from_value(envelope.payload.clone()).map_err(|e| err(e.to_string()))?;
        let timestamp = DateTime::<Utc>::from_timestamp(payload.bucket_start, 0)
            .ok_or_else(|| err(format!("bucket_start {} out of range", payload.bucket_start)))?;

        payload
            .pools
            .into_iter()
            .map(|row| {
                let record = SnapshotRecord {
                    pool: PoolDescriptor {
                        key: PoolKey::new(row.protocol, row.chain, row.pool_address),
                        name: row.name,
                        asset_symbols: row.asset_symbols,
                        metadata: BTreeMap::from([(
                            "step_secs".to_string(),
                            serde_json::Value::from(payload.step_secs),
                        )]),
                    },
                    timestamp,
                    source: self.name().to_string(),
                    supply_apy: row.supply_apy,
                    borrow_apy: row.borrow_apy,
                    incentive_apy: row.incentive_apy,
                    utilization: row.utilization,
                    tvl_usd: row.tvl_usd,
                };
                check_record(&record).map_err(err)?;
                Ok(record)
            })
            .collect()
    }
}

/// Generator seeded from the pool identity and the bucket start.
fn bucket_rng(seed: &SeedPool, bucket_start: i64) -> ChaCha20Rng {
    let mut hasher = Sha3::v256();
    hasher.update(seed.key().to_string().as_bytes());
    hasher.update(&bucket_start.to_be_bytes());
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    ChaCha20Rng::from_seed(digest)
}

/// Uniform offset in `[-spread, spread]`, on a grid of a thousandth of the spread.
fn jitter<R: Rng>(rng: &mut R, spread: Decimal) -> Decimal {
    let unit = Decimal::new(rng.gen_range(-1_000..=1_000), 3);
    (unit * spread).round_dp(4)
}
