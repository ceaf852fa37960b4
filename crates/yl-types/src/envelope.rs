use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiny_keccak::{Hasher, Sha3};

/// One raw provider response, exactly as received.
///
/// `key` names the logical fetch target and data window the payload describes. It is
/// chosen by the provider so that re-fetching the same data yields the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnvelope {
    pub provider: String,
    pub key: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl RawEnvelope {
    pub fn new(
        provider: impl Into<String>,
        key: impl Into<String>,
        payload: Value,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider: provider.into(),
            key: key.into(),
            payload,
            received_at,
        }
    }

    /// Hex encoded SHA3-256 of the payload's canonical JSON form.
    ///
    /// Depends on content only: `received_at` and object key order do not affect it.
    pub fn checksum(&self) -> String {
        let mut bytes = Vec::new();
        write_canonical(&self.payload, &mut bytes);

        let mut hasher = Sha3::v256();
        hasher.update(&bytes);
        let mut hash = [0u8; 32];
        hasher.finalize(&mut hash);
        hex::encode(hash)
    }
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push(b'{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(k.clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(v, out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}
