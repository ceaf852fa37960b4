use thiserror::Error;
use yieldlens_db::DatabaseError;
use yieldlens_providers::ProviderError;
use yieldlens_types::ConfigError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to persist ingestion cycle: {0}")]
    Database(#[from] DatabaseError),

    #[error("Unauthorized ingestion trigger")]
    Unauthorized,

    #[error("Unknown ingestion target '{0}'")]
    UnknownTarget(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IngestError {
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::RateLimited { .. }))
    }
}
