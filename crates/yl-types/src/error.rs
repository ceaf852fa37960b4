use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing credential '{setting}' required by provider '{provider}'")]
    MissingCredential { provider: String, setting: String },
    #[error("invalid value for '{setting}': {reason}")]
    Invalid { setting: String, reason: String },
}

impl ConfigError {
    pub fn invalid(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            setting: setting.into(),
            reason: reason.into(),
        }
    }
}
