//! repodocs - AI-Generated Repository Documentation
//!
//! Generates Markdown documentation for GitHub repositories by rotating
//! across several LLM vendors. A request fetches a repository snapshot,
//! then tries providers round-robin from a sticky cursor until one returns
//! content or the attempt budget (`providers * max_provider_attempts`) is
//! spent.
//!
//! ## Core Features
//!
//! - **Provider Failover**: Gemini, OpenRouter and Mistral behind one trait
//! - **Per-Provider Retry**: linear backoff for transient failures only
//! - **TTL Caching**: snapshots and documentation, keyed per provider and revision
//! - **Error Taxonomy**: categorized provider errors and request-level failure kinds
//!
//! ## Quick Start
//!
//! ```ignore
//! use repodocs::{Config, DocsService, GenerateRequest};
//! use secrecy::SecretString;
//!
//! let service = DocsService::from_config(&Config::default());
//! let token = SecretString::from(std::env::var("GITHUB_TOKEN")?);
//! let response = service
//!     .handle(GenerateRequest::new("rust-lang", "rust", token))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: providers, retry, generator, prompt, timeouts
//! - [`github`]: repository snapshot source
//! - [`service`]: request validation and the response envelope
//! - [`cache`]: in-memory TTL cache
//! - [`config`]: layered configuration

pub mod ai;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod github;
pub mod service;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{ErrorCategory, FailureKind, ProviderError, RepoDocsError, Result};
pub use types::snapshot::{RepositorySnapshot, RepositorySummary};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use ai::{
    DocumentationGenerator, DocumentationProvider, GeneratedDocumentation, ProviderRegistry,
    RetryPolicy, TimeoutConfig, with_timeout,
};
pub use cache::{SharedCache, TtlCache};
pub use github::{GitHubClient, RepositorySource};
pub use service::{DocsService, GenerateRequest, GenerationResponse};
