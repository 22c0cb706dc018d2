//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/repodocs/) and project (.repodocs/) level configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::prompt::PromptLimits;
use crate::ai::provider::{ProviderConfig, ProviderKind};
use crate::ai::retry::RetryPolicy;
use crate::ai::timeout::TimeoutConfig;
use crate::constants::{
    cache as cache_constants, github as github_constants, network as net_constants,
    retry as retry_constants, rotation,
};
use crate::types::{RepoDocsError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// GitHub API settings
    pub github: GitHubConfig,

    /// Rotation, caching and retry settings
    pub generation: GenerationConfig,

    /// Per-vendor LLM provider settings
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            github: GitHubConfig::default(),
            generation: GenerationConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `RepoDocsError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        for kind in ProviderKind::ALL {
            let provider = self.providers.get(kind);
            if !(0.0..=2.0).contains(&provider.temperature) {
                return Err(RepoDocsError::Config(format!(
                    "providers.{}.temperature must be between 0.0 and 2.0, got {}",
                    kind, provider.temperature
                )));
            }
            if provider.timeout_secs == 0 {
                return Err(RepoDocsError::Config(format!(
                    "providers.{}.timeout_secs must be greater than 0",
                    kind
                )));
            }
            if provider.max_tokens == 0 {
                return Err(RepoDocsError::Config(format!(
                    "providers.{}.max_tokens must be greater than 0",
                    kind
                )));
            }
        }

        let generation = &self.generation;
        if generation.max_provider_attempts == 0 {
            return Err(RepoDocsError::Config(
                "generation.max_provider_attempts must be greater than 0".to_string(),
            ));
        }
        if generation.retry.max_attempts == 0 {
            return Err(RepoDocsError::Config(
                "generation.retry.max_attempts must be greater than 0".to_string(),
            ));
        }
        if generation.timeout_secs == 0 {
            return Err(RepoDocsError::Config(
                "generation.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if generation.cache_sweep_secs == 0 {
            return Err(RepoDocsError::Config(
                "generation.cache_sweep_secs must be greater than 0".to_string(),
            ));
        }

        if self.github.timeout_secs == 0 {
            return Err(RepoDocsError::Config(
                "github.timeout_secs must be greater than 0".to_string(),
            ));
        }
        url::Url::parse(&self.github.api_base).map_err(|e| {
            RepoDocsError::Config(format!(
                "github.api_base is not a valid URL '{}': {}",
                self.github.api_base, e
            ))
        })?;

        Ok(())
    }

    pub fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig::new(
            Duration::from_secs(self.github.timeout_secs),
            Duration::from_secs(self.generation.timeout_secs),
        )
    }
}

// =============================================================================
// GitHub Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API base URL (GitHub Enterprise uses `https://host/api/v3`)
    pub api_base: String,
    pub timeout_secs: u64,
    /// Repository snapshot cache lifetime
    pub snapshot_ttl_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: github_constants::DEFAULT_API_BASE.to_string(),
            timeout_secs: net_constants::REQUEST_TIMEOUT_SECS,
            snapshot_ttl_secs: cache_constants::SNAPSHOT_TTL_SECS,
        }
    }
}

impl GitHubConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Full passes over the provider list per request
    pub max_provider_attempts: usize,
    /// Generated documentation cache lifetime
    pub cache_ttl_secs: u64,
    /// Caller-level deadline for one generation request
    pub timeout_secs: u64,
    /// Interval of the background expired-entry sweep
    pub cache_sweep_secs: u64,
    pub retry: RetryConfig,
    pub prompt: PromptLimits,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_provider_attempts: rotation::MAX_PROVIDER_ATTEMPTS,
            cache_ttl_secs: cache_constants::DOCUMENTATION_TTL_SECS,
            timeout_secs: net_constants::GENERATION_TIMEOUT_SECS,
            cache_sweep_secs: cache_constants::SWEEP_INTERVAL_SECS,
            retry: RetryConfig::default(),
            prompt: PromptLimits::default(),
        }
    }
}

impl GenerationConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_secs)
    }
}

/// Per-provider retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per provider call, including the first one
    pub max_attempts: usize,
    /// Linear backoff unit in milliseconds
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::MAX_ATTEMPTS,
            base_delay_ms: retry_constants::BASE_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Rotation order; duplicates are ignored
    pub order: Vec<ProviderKind>,
    pub gemini: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub mistral: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: ProviderKind::ALL.to_vec(),
            gemini: ProviderConfig::default(),
            openrouter: ProviderConfig::default(),
            mistral: ProviderConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::Mistral => &self.mistral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.generation.max_provider_attempts, 2);
        assert_eq!(config.generation.cache_ttl().as_secs(), 30 * 60);
        assert_eq!(config.github.snapshot_ttl().as_secs(), 10 * 60);
        assert_eq!(config.providers.order.len(), 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.providers.mistral.temperature = 3.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("providers.mistral.temperature"));

        let mut config = Config::default();
        config.generation.max_provider_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.github.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let retry = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 250,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_toml_round_trip_hides_api_keys() {
        let mut config = Config::default();
        config.providers.gemini.api_key = Some("top-secret".to_string());
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("[providers.gemini]"));
    }
}
