//! Google Gemini Provider
//!
//! Documentation provider using the Generative Language API
//! (`models/{model}:generateContent`). The key travels in the
//! `x-goog-api-key` header rather than the query string so it never shows up
//! in request logs.
//!
//! Safety blocks come in two shapes: `promptFeedback.blockReason` when the
//! prompt itself is refused, and a candidate `finishReason` of `SAFETY` (or a
//! related policy reason) when generation is cut off. Both surface as
//! `ContentRejected` and are not retried.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DocumentationProvider, ProviderConfig, check_status, parse_json, require_content};
use crate::ai::prompt::{PromptLimits, build_documentation_prompt};
use crate::ai::retry::RetryPolicy;
use crate::types::{ErrorCategory, ProviderError, RepositorySnapshot, Result};

pub(crate) const NAME: &str = "gemini";
pub(crate) const API_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Finish reasons that mean the output was withheld by policy
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Gemini provider with secure API key handling
pub struct GeminiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
    retry: RetryPolicy,
    limits: PromptLimits,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key(API_KEY_ENV, NAME)?;
        let api_base = config.endpoint(DEFAULT_API_BASE, NAME)?;
        let client = config.http_client(NAME)?;

        Ok(Self {
            api_key,
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
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

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    /// One `generateContent` call, no retries
    async fn execute(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        debug!(model = %self.model, "Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e, NAME))?;

        let response = check_status(response, NAME).await?;
        let body: GenerateContentResponse = parse_json(response, NAME).await?;
        extract_text(body)
    }
}

fn extract_text(body: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::with_provider(
            ErrorCategory::ContentRejected,
            format!("Prompt blocked: {}", reason),
            NAME,
        )
        .into());
    }

    let Some(candidate) = body.candidates.into_iter().next() else {
        return Err(ProviderError::empty_content(NAME).into());
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if let Some(reason) = candidate.finish_reason.as_deref()
        && BLOCKING_FINISH_REASONS.contains(&reason)
        && text.trim().is_empty()
    {
        return Err(ProviderError::with_provider(
            ErrorCategory::ContentRejected,
            format!("Generation stopped: {}", reason),
            NAME,
        )
        .into());
    }

    require_content(Some(text), NAME)
}

#[async_trait]
impl DocumentationProvider for GeminiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, snapshot: &RepositorySnapshot) -> Result<String> {
        info!(
            "Generating with Gemini (model: {}, repository: {})",
            self.model, snapshot.full_name
        );
        let prompt = build_documentation_prompt(snapshot, &self.limits);
        self.retry.run(NAME, || self.execute(&prompt)).await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models/{}", self.api_base, self.model);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("Gemini API is available with model: {}", self.model);
                Ok(true)
            }
            Ok(resp) => {
                warn!("Gemini API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Gemini API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
