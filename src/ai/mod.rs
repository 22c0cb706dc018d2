//! AI Integration Layer
//!
//! Documentation providers, per-provider retry, the round-robin generator
//! and the caller-level deadline.

pub mod generator;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod timeout;

pub use generator::{
    CachedDocumentation, DocumentationCache, DocumentationGenerator, GeneratedDocumentation,
    GeneratorConfig,
};
pub use prompt::{PromptBuilder, PromptLimits, PromptSection, build_documentation_prompt};
pub use provider::{
    DocumentationProvider, GeminiProvider, MistralProvider, OpenRouterProvider, ProviderConfig,
    ProviderKind, ProviderRegistry, SharedProvider,
};
pub use retry::RetryPolicy;
pub use timeout::{TimeoutConfig, with_timeout};
