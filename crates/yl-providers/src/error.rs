use thiserror::Error;
use yieldlens_types::ConfigError;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network, auth or upstream failure. Retried on the next eligible tick.
    #[error("Provider '{provider}' unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("Provider '{provider}' rate limited the request")]
    RateLimited { provider: String },

    #[error("Provider configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ProviderError {
    pub fn unavailable(provider: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors the scheduler absorbs and retries on a later tick.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

/// A raw payload that does not match the shape its provider produces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot normalize payload '{key}' from provider '{provider}': {reason}")]
pub struct NormalizationError {
    pub provider: String,
    pub key: String,
    pub reason: String,
}

impl NormalizationError {
    pub fn new(
        provider: impl Into<String>,
        key: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self {
            provider: provider.into(),
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
