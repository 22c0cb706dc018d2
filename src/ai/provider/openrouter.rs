//! OpenRouter Gateway Provider
//!
//! Routes documentation requests to a hosted open-weight model through
//! OpenRouter's OpenAI-compatible API. The default model is a free tier.

use async_trait::async_trait;
use tracing::info;

use super::chat::ChatClient;
use super::{DocumentationProvider, ProviderConfig};
use crate::ai::prompt::{PromptLimits, build_documentation_prompt};
use crate::ai::retry::RetryPolicy;
use crate::types::{RepositorySnapshot, Result};

pub(crate) const NAME: &str = "openrouter";
pub(crate) const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "meta-llama/llama-3.1-8b-instruct:free";

/// OpenRouter app attribution headers
const REFERER: &str = "https://github.com/junyeong-ai/repodocs";
const TITLE: &str = "repodocs";

#[derive(Debug)]
pub struct OpenRouterProvider {
    chat: ChatClient,
    retry: RetryPolicy,
    limits: PromptLimits,
}

impl OpenRouterProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let chat = ChatClient::new(NAME, &config, API_KEY_ENV, DEFAULT_API_BASE, DEFAULT_MODEL)?
            .with_header("http-referer", REFERER)
            .with_header("x-title", TITLE);

        Ok(Self {
            chat,
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
impl DocumentationProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        self.chat.model()
    }

    async fn generate(&self, snapshot: &RepositorySnapshot) -> Result<String> {
        info!(
            "Generating with OpenRouter (model: {}, repository: {})",
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
