//! Documentation Generator
//!
//! Round-robin failover over the configured providers with a sticky cursor
//! and a per-provider result cache.
//!
//! ## Strategy
//!
//! 1. No providers: fail with `NoProvidersConfigured`, no network traffic
//! 2. Probe the cache with each provider's key, in rotation order from the cursor
//! 3. Try providers starting at the cursor, each doing its own local retries
//! 4. Failure advances the cursor (compare-and-swap, so concurrent callers
//!    never double-advance); success parks the cursor on the winner
//! 5. Give up after `providers * max_provider_attempts` calls
//!
//! The cursor outlives a single request: the provider that answered last is
//! tried first next time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::ai::provider::{ProviderRegistry, SharedProvider};
use crate::cache::{SharedCache, TtlCache};
use crate::config::GenerationConfig;
use crate::constants::{cache as cache_constants, rotation};
use crate::types::{ProviderError, RepoDocsError, RepositorySnapshot, Result};

/// Successful generation with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocumentation {
    /// Markdown, never blank
    pub content: String,
    /// Provider that produced the content
    pub provider: String,
    /// Whether the content came from the cache
    pub cached: bool,
}

/// Cache value: content plus the provider that wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocumentation {
    pub content: String,
    pub provider: String,
}

pub type DocumentationCache = SharedCache<CachedDocumentation>;

/// Rotation and caching settings for the generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Full passes over the provider list per request
    pub max_provider_attempts: usize,
    /// Lifetime of cached documentation
    pub cache_ttl: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_provider_attempts: rotation::MAX_PROVIDER_ATTEMPTS,
            cache_ttl: Duration::from_secs(cache_constants::DOCUMENTATION_TTL_SECS),
        }
    }
}

impl From<&GenerationConfig> for GeneratorConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_provider_attempts: config.max_provider_attempts.max(1),
            cache_ttl: config.cache_ttl(),
        }
    }
}

/// Provider rotation with caching
pub struct DocumentationGenerator {
    providers: Vec<SharedProvider>,
    /// Index of the provider tried first; always `< providers.len()` when non-empty
    cursor: AtomicUsize,
    cache: DocumentationCache,
    config: GeneratorConfig,
}

impl std::fmt::Debug for DocumentationGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentationGenerator")
            .field("providers", &self.available_providers())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .field("cache_entries", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

impl DocumentationGenerator {
    /// Generator with its own private cache
    pub fn new(registry: ProviderRegistry, config: GeneratorConfig) -> Self {
        let cache = TtlCache::shared(config.cache_ttl);
        Self::with_cache(registry.into_providers(), cache, config)
    }

    /// Generator sharing an existing cache
    pub fn with_cache(
        providers: Vec<SharedProvider>,
        cache: DocumentationCache,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            providers,
            cursor: AtomicUsize::new(0),
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &DocumentationCache {
        &self.cache
    }

    /// Cache key for one repository revision generated by one provider
    ///
    /// Format: `docs:{full_name}:{provider}:{updated_at|unknown}`, name lowercased
    pub fn cache_key(snapshot: &RepositorySnapshot, provider: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            cache_constants::DOCS_PREFIX,
            snapshot.full_name.to_lowercase(),
            provider,
            snapshot
                .freshness_marker()
                .unwrap_or_else(|| "unknown".to_string())
        )
    }

    /// Provider names in rotation order
    pub fn available_providers(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Provider that will be tried first on the next request
    pub fn current_provider(&self) -> Option<String> {
        let idx = self.cursor.load(Ordering::Acquire);
        self.providers.get(idx).map(|p| p.name().to_string())
    }

    /// Drop cached documentation for a repository across all providers
    pub fn clear_cache(&self, full_name: &str) -> usize {
        let prefix = format!(
            "{}:{}:",
            cache_constants::DOCS_PREFIX,
            full_name.to_lowercase()
        );
        let removed = self.cache.delete_prefix(&prefix);
        debug!(repository = full_name, removed, "Cleared cached documentation");
        removed
    }

    fn cached(&self, snapshot: &RepositorySnapshot, start: usize) -> Option<GeneratedDocumentation> {
        let n = self.providers.len();
        (0..n)
            .map(|offset| &self.providers[(start + offset) % n])
            .find_map(|provider| self.cache.get(&Self::cache_key(snapshot, provider.name())))
            .map(|entry| GeneratedDocumentation {
                content: entry.content,
                provider: entry.provider,
                cached: true,
            })
    }

    /// Generate documentation, trying providers in rotation until one succeeds
    #[instrument(skip(self, snapshot), fields(repository = %snapshot.full_name, providers = self.providers.len()))]
    pub async fn generate_documentation(
        &self,
        snapshot: &RepositorySnapshot,
    ) -> Result<GeneratedDocumentation> {
        let n = self.providers.len();
        if n == 0 {
            return Err(RepoDocsError::NoProvidersConfigured);
        }

        let start = self.cursor.load(Ordering::Acquire) % n;

        if let Some(hit) = self.cached(snapshot, start) {
            info!(provider = %hit.provider, "Returning cached documentation");
            return Ok(hit);
        }

        let budget = n * self.config.max_provider_attempts.max(1);
        let mut last_error: Option<RepoDocsError> = None;
        let mut attempts = 0;

        for i in 0..budget {
            let idx = (start + i) % n;
            let provider = &self.providers[idx];
            attempts += 1;

            debug!(
                attempt = attempts,
                max_attempts = budget,
                provider = provider.name(),
                "Rotation attempt"
            );

            let outcome = match provider.generate(snapshot).await {
                Ok(content) if content.trim().is_empty() => {
                    Err(ProviderError::empty_content(provider.name()).into())
                }
                other => other,
            };

            match outcome {
                Ok(content) => {
                    self.cache.set(
                        Self::cache_key(snapshot, provider.name()),
                        CachedDocumentation {
                            content: content.clone(),
                            provider: provider.name().to_string(),
                        },
                        self.config.cache_ttl,
                    );
                    self.cursor.store(idx, Ordering::Release);

                    info!(provider = provider.name(), attempts, "Documentation generated");
                    return Ok(GeneratedDocumentation {
                        content,
                        provider: provider.name().to_string(),
                        cached: false,
                    });
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        attempt = attempts,
                        error = %err,
                        "Provider failed, rotating"
                    );
                    // Only advance if nobody else moved the cursor meanwhile
                    let _ = self.cursor.compare_exchange(
                        idx,
                        (idx + 1) % n,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    last_error = Some(err);
                }
            }
        }

        let last_category = match &last_error {
            Some(RepoDocsError::Provider(e)) => Some(e.category),
            _ => None,
        };
        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());

        warn!(attempts, "All providers failed");
        Err(RepoDocsError::AllProvidersFailed {
            providers_tried: n.min(attempts),
            attempts,
            last_error,
            last_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::DocumentationProvider;
    use crate::types::ErrorCategory;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail(ErrorCategory),
        Blank,
    }

    struct MockProvider {
        name: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentationProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn generate(&self, snapshot: &RepositorySnapshot) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(format!("# {} by {}", snapshot.name, self.name)),
                Behavior::Fail(category) => {
                    Err(ProviderError::with_provider(category, "mock failure", self.name).into())
                }
                Behavior::Blank => Ok("   ".to_string()),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn generator(providers: &[Arc<MockProvider>]) -> DocumentationGenerator {
        let shared: Vec<SharedProvider> = providers
            .iter()
            .map(|p| p.clone() as SharedProvider)
            .collect();
        DocumentationGenerator::with_cache(
            shared,
            TtlCache::shared(Duration::from_secs(60)),
            GeneratorConfig::default(),
        )
    }

    fn snapshot(name: &str) -> RepositorySnapshot {
        RepositorySnapshot::new("octo", name)
            .with_updated_at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_no_providers_fails_fast() {
        let generator = generator(&[]);
        let err = generator
            .generate_documentation(&snapshot("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoDocsError::NoProvidersConfigured));
        assert!(generator.current_provider().is_none());
        assert!(generator.available_providers().is_empty());
    }

    #[tokio::test]
    async fn test_round_robin_fails_over_and_sticks() {
        let a = MockProvider::new("a", Behavior::Fail(ErrorCategory::Transient));
        let b = MockProvider::new("b", Behavior::Fail(ErrorCategory::Auth));
        let c = MockProvider::new("c", Behavior::Succeed);
        let generator = generator(&[a.clone(), b.clone(), c.clone()]);

        let docs = generator
            .generate_documentation(&snapshot("first"))
            .await
            .unwrap();
        assert_eq!(docs.provider, "c");
        assert!(!docs.cached);
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
        assert_eq!(generator.current_provider().as_deref(), Some("c"));

        // Next request starts at the last winner
        let docs = generator
            .generate_documentation(&snapshot("second"))
            .await
            .unwrap();
        assert_eq!(docs.provider, "c");
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_rotation_is_bounded() {
        let providers = [
            MockProvider::new("a", Behavior::Fail(ErrorCategory::Transient)),
            MockProvider::new("b", Behavior::Fail(ErrorCategory::RateLimit)),
            MockProvider::new("c", Behavior::Fail(ErrorCategory::Network)),
        ];
        let generator = generator(&providers);

        let err = generator
            .generate_documentation(&snapshot("hello"))
            .await
            .unwrap_err();
        match err {
            RepoDocsError::AllProvidersFailed {
                providers_tried,
                attempts,
                last_error,
                last_category,
            } => {
                assert_eq!(providers_tried, 3);
                assert_eq!(attempts, 6);
                assert!(last_error.contains("[c:NETWORK]"));
                assert_eq!(last_category, Some(ErrorCategory::Network));
            }
            other => panic!("expected aggregate failure, got {:?}", other),
        }
        for provider in &providers {
            assert_eq!(provider.calls(), 2);
        }
        assert!(generator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_blank_content_is_failure() {
        let blank = MockProvider::new("blank", Behavior::Blank);
        let good = MockProvider::new("good", Behavior::Succeed);
        let generator = generator(&[blank.clone(), good.clone()]);

        let docs = generator
            .generate_documentation(&snapshot("hello"))
            .await
            .unwrap();
        assert_eq!(docs.provider, "good");
        assert_eq!(blank.calls(), 1);
        assert_eq!(generator.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_http_body_fails_over() {
        use crate::ai::provider::{GeminiProvider, ProviderConfig};
        use crate::ai::retry::RetryPolicy;

        let mut server = mockito::Server::new_async().await;
        let empty = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body("")
            .expect(3)
            .create_async()
            .await;
        let gemini: SharedProvider = Arc::new(
            GeminiProvider::new(ProviderConfig::with_api_key("g-key").api_base(server.url()))
                .unwrap()
                .with_retry(RetryPolicy::new(3, Duration::from_millis(1))),
        );
        let good = MockProvider::new("good", Behavior::Succeed);
        let generator = DocumentationGenerator::with_cache(
            vec![gemini, good.clone() as SharedProvider],
            TtlCache::shared(Duration::from_secs(60)),
            GeneratorConfig::default(),
        );

        let docs = generator
            .generate_documentation(&snapshot("hello"))
            .await
            .unwrap();
        assert_eq!(docs.provider, "good");
        assert_eq!(good.calls(), 1);
        assert_eq!(generator.current_provider().as_deref(), Some("good"));
        empty.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let provider = MockProvider::new("a", Behavior::Succeed);
        let generator = generator(&[provider.clone()]);
        let snapshot = snapshot("hello");

        let first = generator.generate_documentation(&snapshot).await.unwrap();
        let second = generator.generate_documentation(&snapshot).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.content, second.content);
        assert_eq!(second.provider, "a");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_reports_stored_provider() {
        let a = MockProvider::new("a", Behavior::Succeed);
        let b = MockProvider::new("b", Behavior::Succeed);
        let generator = generator(&[a.clone(), b.clone()]);
        let snapshot = snapshot("hello");

        generator.cache().insert(
            DocumentationGenerator::cache_key(&snapshot, "b"),
            CachedDocumentation {
                content: "# from b".to_string(),
                provider: "b".to_string(),
            },
        );

        let docs = generator.generate_documentation(&snapshot).await.unwrap();
        assert!(docs.cached);
        assert_eq!(docs.provider, "b");
        assert_eq!(a.calls() + b.calls(), 0);
    }

    #[tokio::test]
    async fn test_new_revision_misses_cache() {
        let provider = MockProvider::new("a", Behavior::Succeed);
        let generator = generator(&[provider.clone()]);

        generator
            .generate_documentation(&snapshot("hello"))
            .await
            .unwrap();
        let updated = snapshot("hello")
            .with_updated_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let docs = generator.generate_documentation(&updated).await.unwrap();

        assert!(!docs.cached);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_is_scoped_to_repository() {
        let provider = MockProvider::new("a", Behavior::Succeed);
        let generator = generator(&[provider.clone()]);

        generator
            .generate_documentation(&snapshot("hello"))
            .await
            .unwrap();
        generator
            .generate_documentation(&snapshot("hello-world"))
            .await
            .unwrap();

        assert_eq!(generator.clear_cache("octo/hello"), 1);
        assert_eq!(generator.cache().len(), 1);
        assert_eq!(generator.clear_cache("octo/hello"), 0);
    }

    #[test]
    fn test_cache_key_format() {
        let key = DocumentationGenerator::cache_key(&snapshot("hello"), "gemini");
        assert!(key.starts_with("docs:octo/hello:gemini:"));
        assert!(!key.ends_with("unknown"));

        let bare = RepositorySnapshot::new("octo", "bare");
        assert_eq!(
            DocumentationGenerator::cache_key(&bare, "mistral"),
            "docs:octo/bare:mistral:unknown"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_keep_cursor_in_range() {
        let providers = [
            MockProvider::new("a", Behavior::Fail(ErrorCategory::Transient)),
            MockProvider::new("b", Behavior::Succeed),
            MockProvider::new("c", Behavior::Fail(ErrorCategory::Transient)),
        ];
        let generator = Arc::new(generator(&providers));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let generator = generator.clone();
                tokio::spawn(async move {
                    generator
                        .generate_documentation(&snapshot(&format!("repo-{}", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            let docs = handle.await.unwrap().unwrap();
            assert_eq!(docs.provider, "b");
        }
        assert_eq!(generator.current_provider().as_deref(), Some("b"));
        assert_eq!(providers[1].calls(), 16);
    }
}
