//! OpenAI-compatible chat completion client
//!
//! OpenRouter and Mistral both speak the `/chat/completions` dialect. This
//! module holds the wire types and a small client parameterized by vendor
//! name, endpoint and extra headers.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ProviderConfig, check_status, parse_json, require_content};
use crate::types::{ErrorCategory, ProviderError, Result};

const SYSTEM_PROMPT: &str =
    "You are a technical writer who produces clear, accurate Markdown documentation for software repositories.";

/// Finish reason reported when the vendor's moderation filtered the output
const CONTENT_FILTER: &str = "content_filter";

/// Chat completion client with secure API key handling
pub(crate) struct ChatClient {
    provider: &'static str,
    /// Never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ChatClient {
    pub(crate) fn new(
        provider: &'static str,
        config: &ProviderConfig,
        default_env: &str,
        default_base: &str,
        default_model: &str,
    ) -> Result<Self> {
        let api_key = config.resolve_api_key(default_env, provider)?;
        let api_base = config.endpoint(default_base, provider)?;
        let client = config.http_client(provider)?;

        Ok(Self {
            provider,
            api_key,
            api_base,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            headers: HeaderMap::new(),
            client,
        })
    }

    /// Attach a static header sent with every request
    pub(crate) fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        }
    }

    /// One completion request, no retries
    pub(crate) async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(provider = self.provider, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.provider))?;

        let response = check_status(response, self.provider).await?;
        let body: ChatCompletionResponse = parse_json(response, self.provider).await?;
        extract_content(body, self.provider)
    }

    pub(crate) async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .headers(self.headers.clone())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("{} API is available", self.provider);
                Ok(true)
            }
            Ok(resp) => {
                warn!("{} API check failed: {}", self.provider, resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("{} API check failed: {}", self.provider, e);
                Ok(false)
            }
        }
    }
}

fn extract_content(body: ChatCompletionResponse, provider: &str) -> Result<String> {
    let Some(choice) = body.choices.into_iter().next() else {
        return Err(ProviderError::empty_content(provider).into());
    };

    if choice.finish_reason.as_deref() == Some(CONTENT_FILTER) {
        return Err(ProviderError::with_provider(
            ErrorCategory::ContentRejected,
            "Completion stopped by content filter",
            provider,
        )
        .into());
    }

    require_content(choice.message.content.map(MessageContent::into_text), provider)
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<MessageContent>,
}

/// Plain string, or the chunked form some vendors return
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    text: Option<String>,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Chunks(chunks) => chunks.into_iter().filter_map(|c| c.text).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepoDocsError;

    fn parse(body: &str) -> ChatCompletionResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_extract_plain_content() {
        let body = parse(
            r##"{"choices":[{"message":{"role":"assistant","content":"# Hello"},"finish_reason":"stop"}]}"##,
        );
        assert_eq!(extract_content(body, "mistral").unwrap(), "# Hello");
    }

    #[test]
    fn test_extract_chunked_content() {
        let body = parse(
            r##"{"choices":[{"message":{"content":[{"type":"text","text":"# He"},{"type":"text","text":"llo"}]},"finish_reason":"stop"}]}"##,
        );
        assert_eq!(extract_content(body, "mistral").unwrap(), "# Hello");
    }

    #[test]
    fn test_content_filter_is_rejection() {
        let body = parse(
            r#"{"choices":[{"message":{"content":""},"finish_reason":"content_filter"}]}"#,
        );
        match extract_content(body, "openrouter") {
            Err(RepoDocsError::Provider(e)) => {
                assert_eq!(e.category, ErrorCategory::ContentRejected)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_choices_is_empty_content() {
        for body in [r#"{"choices":[]}"#, r#"{}"#, r#"{"choices":[{"message":{"content":null}}]}"#] {
            match extract_content(parse(body), "mistral") {
                Err(RepoDocsError::Provider(e)) => {
                    assert_eq!(e.category, ErrorCategory::EmptyContent)
                }
                other => panic!("expected empty content, got {:?}", other),
            }
        }
    }
}
