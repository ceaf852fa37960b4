use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::invalid(
                "window",
                format!("start {start} is after end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}
