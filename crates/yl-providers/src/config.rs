use std::sync::Arc;

use chrono::Duration;
use yieldlens_types::{ConfigError, ProviderKind};

use crate::clients::dune::DEFAULT_DUNE_BASE_URL;
use crate::clients::mock::DEFAULT_STEP_SECS;
use crate::clients::{DuneProvider, MockProvider, TheGraphProvider, mock::default_seeds};
use crate::traits::PoolDataProvider;

/// Provider selection and credentials, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub dune_api_key: Option<String>,
    pub dune_query_id: Option<u64>,
    pub dune_base_url: String,
    /// Fall back to the mock provider when credentials are missing instead of failing.
    pub allow_mock_fallback: bool,
    pub mock_step: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Mock,
            dune_api_key: None,
            dune_query_id: None,
            dune_base_url: DEFAULT_DUNE_BASE_URL.to_string(),
            allow_mock_fallback: false,
            mock_step: Duration::seconds(DEFAULT_STEP_SECS),
        }
    }
}

impl ProviderSettings {
    fn mock(&self) -> Arc<dyn PoolDataProvider> {
        Arc::new(MockProvider::new(default_seeds(), self.mock_step))
    }
}

/// Builds the configured provider.
///
/// Missing credentials are fatal unless `allow_mock_fallback` is set, in which case the
/// mock provider is used and the substitution is logged.
pub fn select_provider(
    settings: &ProviderSettings,
) -> Result<Arc<dyn PoolDataProvider>, ConfigError> {
    match settings.kind {
        ProviderKind::Mock => {
            tracing::info!("[Providers] Using deterministic mock provider");
            Ok(settings.mock())
        }
        ProviderKind::TheGraph => {
            tracing::warn!(
                "[Providers] The Graph provider is not yet supported, every fetch will fail"
            );
            Ok(Arc::new(TheGraphProvider))
        }
        ProviderKind::Dune => {
            let api_key = settings.dune_api_key.as_deref().filter(|k| !k.is_empty());
            if let (Some(api_key), Some(query_id)) = (api_key, settings.dune_query_id) {
                let provider = DuneProvider::new(api_key, query_id, &settings.dune_base_url)
                    .map_err(|e| ConfigError::invalid("DUNE_BASE_URL", e.to_string()))?;
                tracing::info!(query_id, "[Providers] Using Dune provider");
                return Ok(Arc::new(provider));
            }

            let missing = if api_key.is_none() {
                "DUNE_API_KEY"
            } else {
                "DUNE_QUERY_ID"
            };
            if !settings.allow_mock_fallback {
                return Err(ConfigError::MissingCredential {
                    provider: settings.kind.to_string(),
                    setting: missing.to_string(),
                });
            }
            tracing::warn!(
                provider = %settings.kind,
                missing,
                "[Providers] Credential missing, falling back to the mock provider"
            );
            Ok(settings.mock())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_is_fatal_without_fallback() {
        let settings = ProviderSettings {
            kind: ProviderKind::Dune,
            dune_query_id: Some(1),
            ..Default::default()
        };
        let err = select_provider(&settings).err().unwrap();
        assert_eq!(
            err,
            ConfigError::MissingCredential {
                provider: "dune".to_string(),
                setting: "DUNE_API_KEY".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_credential_falls_back_to_mock_when_allowed() {
        let settings = ProviderSettings {
            kind: ProviderKind::Dune,
            dune_api_key: Some("key".to_string()),
            allow_mock_fallback: true,
            ..Default::default()
        };
        let provider = select_provider(&settings).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Mock);
    }

    #[test]
    fn test_dune_with_credentials() {
        let settings = ProviderSettings {
            kind: ProviderKind::Dune,
            dune_api_key: Some("key".to_string()),
            dune_query_id: Some(3_456_789),
            ..Default::default()
        };
        let provider = select_provider(&settings).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Dune);
        assert_eq!(provider.name(), "dune");
    }
}
