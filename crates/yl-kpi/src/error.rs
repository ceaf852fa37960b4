use thiserror::Error;
use yieldlens_db::DatabaseError;
use yieldlens_types::{ConfigError, PoolKey};

#[derive(Debug, Error)]
pub enum KpiError {
    #[error("Calculation error: {0}")]
    CalculationError(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Failures of the read-side contracts.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Pool {0} not found")]
    PoolNotFound(PoolKey),
    #[error(transparent)]
    Kpi(#[from] KpiError),
    #[error(transparent)]
    InvalidConstraints(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
