//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for retry, failover and user-facing reporting.
//!
//! ## Error Categories
//!
//! - **Transient / Network / RateLimit**: retried on the same provider
//! - **EmptyContent / ParseError**: provider answered badly, retried on the same provider
//! - **Auth / BadRequest / ContentRejected**: surfaced at once, the next provider is tried
//! - **Unavailable**: provider endpoint missing or down, next provider
//!
//! ## Layers
//!
//! - [`ProviderError`]: one failed attempt against one provider
//! - [`RepoDocsError`]: application error, including the aggregate failover error
//! - [`FailureKind`]: what the boundary layer tells the caller

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry and failover decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry same provider
    RateLimit,
    /// Authentication failed - don't retry
    Auth,
    /// Network/connectivity issues, request timeouts - retry with backoff
    Network,
    /// Provider endpoint unavailable (404, unknown model)
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Response body could not be decoded
    ParseError,
    /// Response decoded but carried no usable text
    EmptyContent,
    /// Provider refused the prompt (safety / content filter)
    ContentRejected,
    /// Temporary server issues (5xx, overloaded)
    Transient,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::EmptyContent => write!(f, "EMPTY_CONTENT"),
            Self::ContentRejected => write!(f, "CONTENT_REJECTED"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is retryable on the same provider
    ///
    /// Empty content is retried: vendors occasionally return an empty
    /// completion under load. An explicit content-policy refusal is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit
                | Self::Network
                | Self::Transient
                | Self::ParseError
                | Self::EmptyContent
                | Self::Unknown
        )
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// A single provider attempt failure with category and retry hints
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// HTTP status, when the failure came from an HTTP response
    pub status: Option<u16>,
    /// Suggested wait time before retry (from `Retry-After`)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            status: None,
            retry_after: None,
        }
    }

    /// Create error with provider context
    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self::new(category, message).provider(provider)
    }

    /// Add provider context to existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Completion decoded fine but the text was empty or whitespace
    pub fn empty_content(provider: impl Into<String>) -> Self {
        Self::with_provider(
            ErrorCategory::EmptyContent,
            "Provider returned empty content",
            provider,
        )
    }

    /// Check if error is retryable on the same provider
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    /// Translate a reqwest transport error (never an HTTP status error)
    pub fn from_transport(err: &reqwest::Error, provider: &str) -> Self {
        let category = if err.is_timeout() || err.is_connect() || err.is_request() {
            ErrorCategory::Network
        } else if err.is_decode() || err.is_body() {
            ErrorCategory::ParseError
        } else {
            ErrorCategory::Unknown
        };
        Self::with_provider(category, format!("Request failed: {}", err), provider)
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Error classifier for retry routing
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> ProviderError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400 | 422 => ErrorCategory::BadRequest,
            404 => ErrorCategory::Unavailable,
            408 => ErrorCategory::Network,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        ProviderError::with_provider(category, message, provider).status(status)
    }

    /// Classify a free-form error message
    ///
    /// Only used when no HTTP status or transport error is available.
    pub fn classify(message: &str, provider: &str) -> ProviderError {
        let lower = message.to_lowercase();

        let category = if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            ErrorCategory::RateLimit
        } else if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            ErrorCategory::Auth
        } else if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("network")
        {
            ErrorCategory::Network
        } else if lower.contains("safety")
            || lower.contains("content filter")
            || lower.contains("content_filter")
            || lower.contains("blocked")
        {
            ErrorCategory::ContentRejected
        } else if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("overloaded")
            || lower.contains("temporar")
        {
            ErrorCategory::Transient
        } else if lower.contains("parse") || lower.contains("json") {
            ErrorCategory::ParseError
        } else {
            ErrorCategory::Unknown
        };

        ProviderError::with_provider(category, message, provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum RepoDocsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// One provider exhausted its local retries
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("No AI providers configured")]
    NoProvidersConfigured,

    /// Every provider in the rotation failed
    #[error("All AI providers failed ({providers_tried} providers, {attempts} attempts). Last error: {last_error}")]
    AllProvidersFailed {
        providers_tried: usize,
        attempts: usize,
        last_error: String,
        last_category: Option<ErrorCategory>,
    },

    /// Caller-level deadline expired; the whole generation chain was abandoned
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("GitHub API error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    GitHub {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ProviderError> for RepoDocsError {
    fn from(err: ProviderError) -> Self {
        RepoDocsError::Provider(err)
    }
}

pub type Result<T> = std::result::Result<T, RepoDocsError>;

impl RepoDocsError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn github(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::GitHub {
            status,
            message: message.into(),
        }
    }

    /// Check if a provider should retry this error locally
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// Failure Kind (boundary classification)
// =============================================================================

/// Caller-visible failure classification
///
/// Derived from the error variant first; message text is consulted only for
/// provider errors whose category is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Unauthorized,
    RateLimited,
    Timeout,
    Unavailable,
    InvalidRequest,
    NotFound,
    Unknown,
}

impl FailureKind {
    pub fn classify(err: &RepoDocsError) -> Self {
        match err {
            RepoDocsError::Config(_) | RepoDocsError::NoProvidersConfigured => Self::Configuration,
            RepoDocsError::Timeout { .. } => Self::Timeout,
            RepoDocsError::InvalidRequest(_) => Self::InvalidRequest,
            RepoDocsError::GitHub { status, .. } => match status {
                Some(401) | Some(403) => Self::Unauthorized,
                Some(404) => Self::NotFound,
                Some(429) => Self::RateLimited,
                Some(500..=599) | None => Self::Unavailable,
                _ => Self::Unknown,
            },
            RepoDocsError::Provider(e) => Self::from_category(e),
            RepoDocsError::AllProvidersFailed {
                last_error,
                last_category,
                ..
            } => match last_category {
                Some(category) if *category != ErrorCategory::Unknown => {
                    Self::from_category(&ProviderError::new(*category, last_error.as_str()))
                }
                _ => Self::from_category(&ErrorClassifier::classify(last_error, "chain")),
            },
            RepoDocsError::Io(_) | RepoDocsError::Json(_) => Self::Unknown,
        }
    }

    fn from_category(err: &ProviderError) -> Self {
        match err.category {
            ErrorCategory::Auth => Self::Unauthorized,
            ErrorCategory::RateLimit => Self::RateLimited,
            ErrorCategory::Network => Self::Timeout,
            ErrorCategory::Transient | ErrorCategory::Unavailable => Self::Unavailable,
            ErrorCategory::BadRequest | ErrorCategory::ContentRejected => Self::InvalidRequest,
            ErrorCategory::ParseError | ErrorCategory::EmptyContent | ErrorCategory::Unknown => {
                Self::Unknown
            }
        }
    }

    /// Whether a client UI should offer an automatic retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::Unavailable)
    }

    /// Human readable remediation hint
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "Documentation service is not configured. Check the AI provider API keys."
            }
            Self::Unauthorized => "Access was denied. Sign in again or check the access token.",
            Self::RateLimited => "Rate limit reached. Please wait a moment and try again.",
            Self::Timeout => "Generation timed out. The service may be busy, try again later.",
            Self::Unavailable => "AI providers are temporarily unavailable. Try again later.",
            Self::InvalidRequest => "The request could not be processed.",
            Self::NotFound => "Repository not found or not accessible with this token.",
            Self::Unknown => "An unexpected error occurred while generating documentation.",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Tests
// =============================================================================
