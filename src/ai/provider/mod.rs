//! Documentation Provider Abstraction
//!
//! Defines the [`DocumentationProvider`] trait: turn a repository snapshot into
//! Markdown documentation using one external LLM vendor.
//!
//! ## Modules
//!
//! - `gemini`: Google Generative Language API (`generateContent`)
//! - `chat`: OpenAI-compatible chat completion wire types shared by gateways
//! - `openrouter`: OpenRouter chat completion gateway
//! - `mistral`: Mistral chat completions
//! - `registry`: builds the ordered provider list from configuration
//!
//! Every provider runs its single upstream call through the shared
//! [`RetryPolicy`](crate::ai::retry::RetryPolicy). Failover across providers
//! is the generator's job.

mod chat;
mod gemini;
mod mistral;
mod openrouter;
mod registry;

pub use gemini::GeminiProvider;
pub use mistral::MistralProvider;
pub use openrouter::OpenRouterProvider;
pub use registry::{ProviderKind, ProviderRegistry};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::network as net_constants;
use crate::types::{
    ErrorCategory, ErrorClassifier, ProviderError, RepoDocsError, RepositorySnapshot, Result,
};

/// Shared provider type for concurrent access from the generator
pub type SharedProvider = Arc<dyn DocumentationProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Per-vendor provider configuration
///
/// API keys are never serialized and are redacted in debug output. When
/// `api_key` is unset the key is read from `api_key_env`, falling back to the
/// vendor's standard environment variable.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Disabled providers are skipped even when a credential is present
    pub enabled: bool,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Never serialized to output for security
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// API base URL (for proxies and tests)
    pub api_base: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("enabled", &self.enabled)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            timeout_secs: net_constants::REQUEST_TIMEOUT_SECS,
            temperature: 0.3,
            max_tokens: 4096,
            api_key: None,
            api_key_env: None,
            api_base: None,
        }
    }
}

impl ProviderConfig {
    /// Config with an explicit key, used by tests and embedders
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Name of the environment variable consulted for the key
    pub fn credential_env<'a>(&'a self, default_env: &'a str) -> &'a str {
        self.api_key_env.as_deref().unwrap_or(default_env)
    }

    /// Whether a non-blank credential is available without constructing the provider
    pub fn has_credential(&self, default_env: &str) -> bool {
        self.lookup_api_key(default_env).is_some()
    }

    fn lookup_api_key(&self, default_env: &str) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.credential_env(default_env)).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolve the API key or fail with a configuration error
    pub(crate) fn resolve_api_key(&self, default_env: &str, provider: &str) -> Result<SecretString> {
        self.lookup_api_key(default_env)
            .map(SecretString::from)
            .ok_or_else(|| {
                RepoDocsError::Config(format!(
                    "{} API key not found. Set {} env var or provide it in config",
                    provider,
                    self.credential_env(default_env)
                ))
            })
    }

    /// Validated base URL without a trailing slash
    pub(crate) fn endpoint(&self, default_base: &str, provider: &str) -> Result<String> {
        validate_endpoint(self.api_base.as_deref().unwrap_or(default_base), provider)
    }

    pub(crate) fn http_client(&self, provider: &str) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(net_constants::USER_AGENT)
            .build()
            .map_err(|e| {
                RepoDocsError::Config(format!("Failed to create HTTP client for {}: {}", provider, e))
            })
    }
}

// =============================================================================
// Documentation Provider Trait
// =============================================================================

/// One LLM vendor able to write documentation for a repository
#[async_trait]
pub trait DocumentationProvider: Send + Sync {
    /// Provider name for logging, cache keys and provenance
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Generate Markdown documentation for `snapshot`
    ///
    /// Retries retryable failures internally; the returned text is never blank.
    async fn generate(&self, snapshot: &RepositorySnapshot) -> Result<String>;

    /// Check if the provider endpoint is reachable with the configured credential
    async fn health_check(&self) -> Result<bool>;
}

// =============================================================================
// Shared HTTP helpers
// =============================================================================

/// Map a non-2xx response to a categorized provider error
pub(crate) async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    let mut err = ErrorClassifier::classify_http_status(
        status.as_u16(),
        &format!("{} API error ({}): {}", provider, status, body.trim()),
        provider,
    );
    if let Some(delay) = retry_after {
        err = err.retry_after(delay);
    }
    Err(err.into())
}

/// Decode a JSON body, treating malformed payloads as retryable parse errors
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    provider: &str,
) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_transport(&e, provider))?;
    // A 200 with nothing in it is an empty completion, not a malformed one
    if body.trim().is_empty() {
        return Err(ProviderError::empty_content(provider).into());
    }
    serde_json::from_str::<T>(&body).map_err(|e| {
        ProviderError::with_provider(
            ErrorCategory::ParseError,
            format!("Failed to parse {} response: {}", provider, e),
            provider,
        )
        .into()
    })
}

/// Reject absent or whitespace-only completions
pub(crate) fn require_content(content: Option<String>, provider: &str) -> Result<String> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::empty_content(provider).into()),
    }
}

/// Validate endpoint URL (SSRF prevention)
///
/// Only allows http/https. Plain http is accepted for loopback hosts only
/// and warned about otherwise.
fn validate_endpoint(endpoint: &str, provider: &str) -> Result<String> {
    let url = url::Url::parse(endpoint).map_err(|e| {
        RepoDocsError::Config(format!("Invalid {} endpoint URL '{}': {}", provider, endpoint, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RepoDocsError::Config(format!(
            "{} endpoint must use http or https scheme, got: {}",
            provider,
            url.scheme()
        )));
    }

    if url.scheme() == "http"
        && let Some(host) = url.host_str()
        && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
    {
        warn!(
            "{} endpoint uses plain http on non-local host: {}. API keys will travel unencrypted.",
            provider, host
        );
    }

    let mut result = url.to_string();
    if result.ends_with('/') {
        result.pop();
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_redacts_key() {
        let config = ProviderConfig::with_api_key("sk-very-secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-very-secret"));

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(!serialized.contains("sk-very-secret"));
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let config = ProviderConfig {
            api_key_env: Some("REPODOCS_TEST_UNSET_PROVIDER_KEY".to_string()),
            ..Default::default()
        };
        assert!(!config.has_credential("REPODOCS_TEST_UNSET_PROVIDER_KEY"));
        let err = config
            .resolve_api_key("REPODOCS_TEST_UNSET_PROVIDER_KEY", "gemini")
            .unwrap_err();
        assert!(matches!(err, RepoDocsError::Config(_)));
        assert!(err.to_string().contains("REPODOCS_TEST_UNSET_PROVIDER_KEY"));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let config = ProviderConfig {
            api_key: Some("   ".to_string()),
            api_key_env: Some("REPODOCS_TEST_UNSET_PROVIDER_KEY".to_string()),
            ..Default::default()
        };
        assert!(!config.has_credential("REPODOCS_TEST_UNSET_PROVIDER_KEY"));
    }

    #[test]
    fn test_validate_endpoint() {
        assert_eq!(
            validate_endpoint("https://api.mistral.ai/v1/", "mistral").unwrap(),
            "https://api.mistral.ai/v1"
        );
        assert!(validate_endpoint("http://127.0.0.1:1234", "mistral").is_ok());
        assert!(matches!(
            validate_endpoint("ftp://example.com", "mistral"),
            Err(RepoDocsError::Config(_))
        ));
        assert!(validate_endpoint("not a url", "mistral").is_err());
    }

    #[test]
    fn test_require_content() {
        assert_eq!(require_content(Some("# Docs".into()), "x").unwrap(), "# Docs");
        for blank in [None, Some(String::new()), Some(" \n\t".into())] {
            match require_content(blank, "x") {
                Err(RepoDocsError::Provider(e)) => {
                    assert_eq!(e.category, ErrorCategory::EmptyContent)
                }
                other => panic!("expected empty content error, got {:?}", other),
            }
        }
    }
}
