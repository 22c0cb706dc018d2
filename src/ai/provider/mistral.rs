//! Mistral API Provider
//!
//! Documentation provider using Mistral's chat completions endpoint.

use async_trait::async_trait;
use tracing::info;

use super::chat::ChatClient;
use super::{DocumentationProvider, ProviderConfig};
use crate::ai::prompt::{PromptLimits, build_documentation_prompt};
use crate::ai::retry::RetryPolicy;
use crate::types::{RepositorySnapshot, Result};

pub(crate) const NAME: &str = "mistral";
pub(crate) const API_KEY_ENV: &str = "MISTRAL_API_KEY";
const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";
const DEFAULT_MODEL: &str = "mistral-large-latest";

#[derive(Debug)]
pub struct MistralProvider {
    chat: ChatClient,
    retry: RetryPolicy,
    limits: PromptLimits,
}

impl MistralProvider {
    /// Fails with a configuration error when no API key is available
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::new(NAME, &config, API_KEY_ENV, DEFAULT_API_BASE, DEFAULT_MODEL)?,
            retry: RetryPolicy::default(),
            limits: PromptLimits::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[async_trait]
impl DocumentationProvider for MistralProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        self.chat.model()
    }

    async fn generate(&self, snapshot: &RepositorySnapshot) -> Result<String> {
        info!(
            "Generating with Mistral (model: {}, repository: {})",
            self.chat.model(),
            snapshot.full_name
        );
        let prompt = build_documentation_prompt(snapshot, &self.limits);
        self.retry.run(NAME, || self.chat.complete(&prompt)).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.chat.health_check().await
    }
}
