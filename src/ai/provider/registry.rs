//! Provider Registry
//!
//! Builds the ordered provider list once at startup. A provider whose
//! credential is missing is left out with an info log, never a startup
//! failure; an empty registry is valid and makes every generation request
//! fail fast with `NoProvidersConfigured`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    GeminiProvider, MistralProvider, OpenRouterProvider, ProviderConfig, SharedProvider, gemini,
    mistral, openrouter,
};
use crate::ai::prompt::PromptLimits;
use crate::ai::retry::RetryPolicy;
use crate::config::{GenerationConfig, ProvidersConfig};
use crate::types::{RepoDocsError, Result};

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenRouter,
    Mistral,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Gemini, Self::OpenRouter, Self::Mistral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => gemini::NAME,
            Self::OpenRouter => openrouter::NAME,
            Self::Mistral => mistral::NAME,
        }
    }

    /// Standard environment variable holding the vendor API key
    pub fn credential_env(&self) -> &'static str {
        match self {
            Self::Gemini => gemini::API_KEY_ENV,
            Self::OpenRouter => openrouter::API_KEY_ENV,
            Self::Mistral => mistral::API_KEY_ENV,
        }
    }

    /// Construct the provider; fails with `Config` when the credential is missing
    pub fn build(
        &self,
        config: &ProviderConfig,
        retry: RetryPolicy,
        limits: PromptLimits,
    ) -> Result<SharedProvider> {
        let provider: SharedProvider = match self {
            Self::Gemini => Arc::new(
                GeminiProvider::new(config.clone())?
                    .with_retry(retry)
                    .with_limits(limits),
            ),
            Self::OpenRouter => Arc::new(
                OpenRouterProvider::new(config.clone())?
                    .with_retry(retry)
                    .with_limits(limits),
            ),
            Self::Mistral => Arc::new(
                MistralProvider::new(config.clone())?
                    .with_retry(retry)
                    .with_limits(limits),
            ),
        };
        Ok(provider)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openrouter" => Ok(Self::OpenRouter),
            "mistral" => Ok(Self::Mistral),
            _ => Err(format!(
                "Unknown provider: {}. Supported: gemini, openrouter, mistral",
                s
            )),
        }
    }
}

/// Ordered, immutable provider list
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<SharedProvider>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new(providers: Vec<SharedProvider>) -> Self {
        Self { providers }
    }

    /// Build every enabled provider with an available credential, in configured order
    pub fn from_config(providers: &ProvidersConfig, generation: &GenerationConfig) -> Self {
        let retry = generation.retry.policy();
        let mut seen = HashSet::new();
        let mut built = Vec::new();

        for kind in providers.order.iter().copied() {
            if !seen.insert(kind) {
                continue;
            }

            let config = providers.get(kind);
            if !config.enabled {
                info!("Provider {} disabled in config, skipping", kind);
                continue;
            }

            match kind.build(config, retry, generation.prompt) {
                Ok(provider) => {
                    info!(
                        "Provider {} available (model: {})",
                        provider.name(),
                        provider.model()
                    );
                    built.push(provider);
                }
                Err(RepoDocsError::Config(msg)) => {
                    info!("Provider {} unavailable: {}", kind, msg);
                }
                Err(e) => {
                    warn!("Provider {} failed to initialize: {}", kind, e);
                }
            }
        }

        if built.is_empty() {
            warn!("No AI providers configured; documentation generation will be unavailable");
        }

        Self { providers: built }
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn providers(&self) -> &[SharedProvider] {
        &self.providers
    }

    pub fn into_providers(self) -> Vec<SharedProvider> {
        self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET: &str = "REPODOCS_TEST_UNSET_REGISTRY_KEY";

    fn without_credential() -> ProviderConfig {
        ProviderConfig {
            api_key_env: Some(UNSET.to_string()),
            ..Default::default()
        }
    }

    fn all_missing() -> ProvidersConfig {
        ProvidersConfig {
            gemini: without_credential(),
            openrouter: without_credential(),
            mistral: without_credential(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_credentials_yield_empty_registry() {
        let registry = ProviderRegistry::from_config(&all_missing(), &GenerationConfig::default());
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_only_credentialed_providers_are_built() {
        let mut providers = all_missing();
        providers.mistral = ProviderConfig::with_api_key("m-key");

        let registry = ProviderRegistry::from_config(&providers, &GenerationConfig::default());
        assert_eq!(registry.names(), vec!["mistral".to_string()]);
    }

    #[test]
    fn test_order_and_disabled_flag() {
        let mut providers = ProvidersConfig {
            order: vec![
                ProviderKind::Mistral,
                ProviderKind::Gemini,
                ProviderKind::Mistral,
                ProviderKind::OpenRouter,
            ],
            gemini: ProviderConfig::with_api_key("g"),
            openrouter: ProviderConfig::with_api_key("o"),
            mistral: ProviderConfig::with_api_key("m"),
        };
        providers.openrouter.enabled = false;

        let registry = ProviderRegistry::from_config(&providers, &GenerationConfig::default());
        assert_eq!(
            registry.names(),
            vec!["mistral".to_string(), "gemini".to_string()]
        );
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!(
            "openrouter".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenRouter
        );
        assert!("claude".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Mistral.credential_env(), "MISTRAL_API_KEY");
    }
}
