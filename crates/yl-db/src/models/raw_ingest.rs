use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use yieldlens_types::RawEnvelope;

use crate::schema::raw_ingests;

/// Append-only audit record of a provider response.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = raw_ingests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RawIngest {
    pub id: i64,
    pub provider: String,
    pub key: String,
    pub checksum: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = raw_ingests)]
pub struct NewRawIngest {
    pub provider: String,
    pub key: String,
    pub checksum: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl NewRawIngest {
    pub fn from_envelope(envelope: &RawEnvelope, checksum: String) -> Self {
        Self {
            provider: envelope.provider.clone(),
            key: envelope.key.clone(),
            checksum,
            payload: envelope.payload.clone(),
            received_at: envelope.received_at,
        }
    }

    pub fn dedupe_key(&self) -> (String, String) {
        (self.key.clone(), self.checksum.clone())
    }
}

impl RawIngest {
    /// `(key, checksum)` pairs already stored for a provider among the given keys
    pub fn find_known(
        provider: &str,
        keys: &[String],
        conn: &mut PgConnection,
    ) -> QueryResult<Vec<(String, String)>> {
        raw_ingests::table
            .filter(raw_ingests::provider.eq(provider))
            .filter(raw_ingests::key.eq_any(keys))
            .select((raw_ingests::key, raw_ingests::checksum))
            .load(conn)
    }

    /// Insert unless the `(provider, key, checksum)` triple already exists.
    /// Returns the number of inserted rows (0 or 1).
    pub fn insert_or_ignore(new_raw: &NewRawIngest, conn: &mut PgConnection) -> QueryResult<usize> {
        diesel::insert_into(raw_ingests::table)
            .values(new_raw)
            .on_conflict((
                raw_ingests::provider,
                raw_ingests::key,
                raw_ingests::checksum,
            ))
            .do_nothing()
            .execute(conn)
    }

    pub fn count(conn: &mut PgConnection) -> QueryResult<i64> {
        raw_ingests::table.count().get_result(conn)
    }
}
