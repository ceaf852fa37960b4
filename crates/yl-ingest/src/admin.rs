use std::sync::Arc;

use chrono::{DateTime, Utc};
use yieldlens_types::{ConfigError, IngestTarget, TargetSelector};

use crate::error::IngestError;
use crate::scheduler::{Scheduler, TargetRun};

/// Credential check in front of manual ingestion triggers.
pub struct AdminGate {
    token: String,
    scheduler: Arc<Scheduler>,
}

impl AdminGate {
    pub fn new(token: impl Into<String>, scheduler: Arc<Scheduler>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::invalid("ADMIN_API_TOKEN", "must not be empty"));
        }
        Ok(Self { token, scheduler })
    }

    pub fn verify(&self, credential: Option<&str>) -> Result<(), IngestError> {
        match credential {
            Some(credential) if constant_time_eq(credential.as_bytes(), self.token.as_bytes()) => {
                Ok(())
            }
            _ => {
                tracing::warn!("[AdminGate] Rejected ingestion trigger with invalid credential");
                Err(IngestError::Unauthorized)
            }
        }
    }

    /// Verifies `credential` before the scheduler is touched.
    pub async fn trigger(
        &self,
        credential: Option<&str>,
        selector: &TargetSelector,
        now: DateTime<Utc>,
    ) -> Result<Vec<(IngestTarget, TargetRun)>, IngestError> {
        self.verify(credential)?;
        tracing::info!(selector = ?selector, "[AdminGate] Manual ingestion triggered");
        self.scheduler.trigger(selector, now).await
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
