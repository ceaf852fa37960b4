use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use yieldlens_types::{
    IngestTarget, PoolDescriptor, PoolKey, ProviderKind, RawEnvelope, SnapshotRecord, TimeWindow,
};

use super::check_record;
use crate::error::{NormalizationError, ProviderError};
use crate::traits::PoolDataProvider;

pub const DEFAULT_DUNE_BASE_URL: &str = "https://api.dune.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Query-based analytics backend. One saved query returns lending pool rows for a
/// `(protocol, chain)` pair and a time range passed as query parameters.
pub struct DuneProvider {
    http_client: Client,
    api_key: String,
    query_id: u64,
    base_url: String,
}

impl DuneProvider {
    pub fn new(api_key: &str, query_id: u64, base_url: &str) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                ProviderError::unavailable(ProviderKind::Dune.as_str(), e)
            })?;

        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            query_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn results_url(&self, target: &IngestTarget, window: TimeWindow) -> String {
        format!(
            "{}/api/v1/query/{}/results?params.protocol={}&params.chain={}&params.start={}&params.end={}",
            self.base_url,
            self.query_id,
            target.protocol,
            target.chain,
            window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    async fn fetch_target(
        &self,
        target: &IngestTarget,
        window: TimeWindow,
    ) -> Result<RawEnvelope, ProviderError> {
        let response = self
            .http_client
            .get(self.results_url(target, window))
            .header("X-Dune-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::unavailable(self.name(), e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: self.name().to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::unavailable(
                self.name(),
                format!("query {} returned HTTP {status}", self.query_id),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(self.name(), e))?;

        // The execution id names the data set; fall back to the requested window.
        let key = match body.get("execution_id").and_then(Value::as_str) {
            Some(execution_id) => format!("{target}:{execution_id}"),
            None => format!(
                "{target}:{}-{}",
                window.start.timestamp(),
                window.end.timestamp()
            ),
        };

        let payload = json!({
            "protocol": target.protocol,
            "chain": target.chain,
            "response": body,
        });
        Ok(RawEnvelope::new(self.name(), key, payload, Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct DunePayload {
    protocol: String,
    chain: String,
    response: DuneResponse,
}

#[derive(Debug, Deserialize)]
struct DuneResponse {
    result: DuneResult,
}

#[derive(Debug, Deserialize)]
struct DuneResult {
    rows: Vec<DuneRow>,
}

#[derive(Debug, Deserialize)]
struct DuneRow {
    pool_address: String,
    #[serde(default)]
    pool_name: Option<String>,
    #[serde(default)]
    symbols: Vec<String>,
    block_time: String,
    supply_apy: Decimal,
    borrow_apy: Decimal,
    #[serde(default)]
    incentive_apy: Decimal,
    utilization: Decimal,
    tvl_usd: Decimal,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Dune renders timestamps as `2024-05-01 13:00:00.000 UTC`; RFC 3339 is accepted too.
fn parse_block_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches(" UTC"), "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[async_trait::async_trait]
impl PoolDataProvider for DuneProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dune
    }

    async fn fetch_raw(
        &self,
        targets: &[IngestTarget],
        window: TimeWindow,
    ) -> Result<Vec<RawEnvelope>, ProviderError> {
        let mut envelopes = Vec::with_capacity(targets.len());
        for target in targets {
            envelopes.push(self.fetch_target(target, window).await?);
        }
        Ok(envelopes)
    }

    fn normalize(&self, envelope: &RawEnvelope) -> Result<Vec<SnapshotRecord>, NormalizationError> {
        normalize_payload(self.name(), envelope)
    }
}

fn normalize_payload(
    source: &str,
    envelope: &RawEnvelope,
) -> Result<Vec<SnapshotRecord>, NormalizationError> {
    let err = |reason: String| NormalizationError::new(source, &envelope.key, reason);

    let payload: DunePayload =
        serde_json::from_value(envelope.payload.clone()).map_err(|e| err(e.to_string()))?;

    payload
        .response
        .result
        .rows
        .into_iter()
        .map(|row| {
            let timestamp = parse_block_time(&row.block_time)
                .ok_or_else(|| err(format!("unparseable block_time '{}'", row.block_time)))?;
            let key = PoolKey::new(&payload.protocol, &payload.chain, row.pool_address);
            let record = SnapshotRecord {
                pool: PoolDescriptor {
                    name: row.pool_name.unwrap_or_else(|| key.pool_address.clone()),
                    key,
                    asset_symbols: row.symbols,
                    metadata: row.extra,
                },
                timestamp,
                source: source.to_string(),
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
