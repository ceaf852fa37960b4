use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Common timeseries data point
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimeseriesPoint {
    pub t: String, // RFC3339 timestamp
    pub v: String, // Value as string for precision
}
