//! Documentation Service
//!
//! Boundary layer between callers (the CLI, or an HTTP handler in an
//! embedding application) and the generation pipeline:
//!
//! 1. Validate the request
//! 2. Fail fast when no provider is configured, before any network call
//! 3. Fetch the repository snapshot (cached)
//! 4. Run the generator under the caller-level deadline
//! 5. Wrap the outcome in a [`GenerationResponse`] envelope
//!
//! Failures are classified into a [`FailureKind`] from the error variant, so
//! callers can decide on retries without parsing messages.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::ai::generator::{DocumentationGenerator, GeneratedDocumentation, GeneratorConfig};
use crate::ai::provider::ProviderRegistry;
use crate::ai::timeout::{TimeoutConfig, with_timeout};
use crate::cache::{SharedCache, TtlCache};
use crate::config::{Config, GitHubConfig};
use crate::constants::github as github_constants;
use crate::github::{GitHubClient, RepositorySource};
use crate::types::{FailureKind, RepoDocsError, RepositorySnapshot, Result};

// =============================================================================
// Request
// =============================================================================

/// One documentation request
#[derive(Debug)]
pub struct GenerateRequest {
    pub repository_owner: String,
    pub repository_name: String,
    pub access_token: SecretString,
    /// Caller's repository id, echoed back in the envelope
    pub repository_id: Option<u64>,
}

impl GenerateRequest {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            repository_owner: owner.into(),
            repository_name: name.into(),
            access_token,
            repository_id: None,
        }
    }

    pub fn with_repository_id(mut self, id: u64) -> Self {
        self.repository_id = Some(id);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.repository_owner, self.repository_name)
    }

    /// Owner and name must be non-blank and at most 100 characters
    pub fn validate(&self) -> Result<()> {
        validate_name("repository owner", &self.repository_owner)?;
        validate_name("repository name", &self.repository_name)
    }
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RepoDocsError::InvalidRequest(format!("{} is required", field)));
    }
    if value.chars().count() > github_constants::MAX_NAME_LEN {
        return Err(RepoDocsError::InvalidRequest(format!(
            "{} exceeds {} characters",
            field,
            github_constants::MAX_NAME_LEN
        )));
    }
    if value.contains('/') {
        return Err(RepoDocsError::InvalidRequest(format!(
            "{} must not contain '/'",
            field
        )));
    }
    Ok(())
}

// =============================================================================
// Response Envelope
// =============================================================================

/// Serialized result of one request (camelCase JSON)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        success: bool,
        content: String,
        provider: String,
        cached: bool,
        repository: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        repository_id: Option<u64>,
        timestamp: String,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        success: bool,
        error: String,
        kind: FailureKind,
        retryable: bool,
        repository: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        repository_id: Option<u64>,
        timestamp: String,
    },
}

impl GenerationResponse {
    pub fn success(
        docs: GeneratedDocumentation,
        repository: impl Into<String>,
        repository_id: Option<u64>,
    ) -> Self {
        Self::Success {
            success: true,
            content: docs.content,
            provider: docs.provider,
            cached: docs.cached,
            repository: repository.into(),
            repository_id,
            timestamp: now_rfc3339(),
        }
    }

    pub fn failure(
        err: &RepoDocsError,
        repository: impl Into<String>,
        repository_id: Option<u64>,
    ) -> Self {
        let kind = FailureKind::classify(err);
        Self::Failure {
            success: false,
            error: err.to_string(),
            kind,
            retryable: kind.is_retryable(),
            repository: repository.into(),
            repository_id,
            timestamp: now_rfc3339(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Copy of a token for a second owner
pub fn clone_token(token: &SecretString) -> SecretString {
    SecretString::from(token.expose_secret().to_owned())
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Service
// =============================================================================

/// Generation pipeline shared by all requests of one process
pub struct DocsService {
    generator: Arc<DocumentationGenerator>,
    github: GitHubConfig,
    snapshots: SharedCache<RepositorySnapshot>,
    timeouts: TimeoutConfig,
}

impl std::fmt::Debug for DocsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocsService")
            .field("generator", &self.generator)
            .field("cached_snapshots", &self.snapshots.len())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl DocsService {
    /// Build providers, caches and generator from configuration
    pub fn from_config(config: &Config) -> Self {
        let registry = ProviderRegistry::from_config(&config.providers, &config.generation);
        let generator = DocumentationGenerator::new(registry, GeneratorConfig::from(&config.generation));
        Self::new(Arc::new(generator), config.github.clone(), config.timeouts())
    }

    pub fn new(
        generator: Arc<DocumentationGenerator>,
        github: GitHubConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        let snapshots = TtlCache::shared(github.snapshot_ttl());
        Self {
            generator,
            github,
            snapshots,
            timeouts,
        }
    }

    pub fn generator(&self) -> &DocumentationGenerator {
        &self.generator
    }

    pub fn snapshot_cache(&self) -> &SharedCache<RepositorySnapshot> {
        &self.snapshots
    }

    /// Periodically evict expired snapshots and documentation
    pub fn spawn_cache_sweepers(&self, interval: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.snapshots.spawn_sweeper(interval),
            self.generator.cache().spawn_sweeper(interval),
        ]
    }

    /// GitHub client for one token, sharing the service's snapshot cache
    pub fn github_client(&self, access_token: &SecretString) -> Result<GitHubClient> {
        Ok(GitHubClient::new(clone_token(access_token), &self.github)?
            .with_cache(self.snapshots.clone()))
    }

    /// Forget cached snapshots and documentation for a repository; returns
    /// the number of documents removed. Names match case-insensitively.
    pub fn refresh(&self, full_name: &str) -> usize {
        self.snapshots.delete_prefix(&GitHubClient::snapshot_cache_prefix(full_name));
        self.generator.clear_cache(full_name)
    }

    /// Validate, fetch and generate; errors are returned unclassified
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedDocumentation> {
        request.validate()?;
        let source = self.github_client(&request.access_token)?;
        self.generate_from(&source, &request.repository_owner, &request.repository_name)
            .await
    }

    /// Generate from an arbitrary repository source
    pub async fn generate_from(
        &self,
        source: &dyn RepositorySource,
        owner: &str,
        name: &str,
    ) -> Result<GeneratedDocumentation> {
        // Fail before GitHub is contacted
        if self.generator.available_providers().is_empty() {
            return Err(RepoDocsError::NoProvidersConfigured);
        }

        let snapshot = source.fetch_snapshot(owner, name).await?;
        with_timeout(
            self.timeouts.generation,
            self.generator.generate_documentation(&snapshot),
            "documentation generation",
        )
        .await
    }

    /// Handle one request end to end, always producing an envelope
    pub async fn handle(&self, request: GenerateRequest) -> GenerationResponse {
        let request_id = Uuid::new_v4();
        let repository = request.full_name();
        let span = info_span!("generate", request_id = %request_id, repository = %repository);

        async {
            info!("Starting documentation generation");
            match self.generate(&request).await {
                Ok(docs) => {
                    info!(
                        provider = %docs.provider,
                        cached = docs.cached,
                        chars = docs.content.chars().count(),
                        "Documentation ready"
                    );
                    GenerationResponse::success(docs, repository.clone(), request.repository_id)
                }
                Err(err) => {
                    error!(error = %err, kind = %FailureKind::classify(&err), "Documentation generation failed");
                    GenerationResponse::failure(&err, repository.clone(), request.repository_id)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{DocumentationProvider, SharedProvider};
    use crate::types::{ErrorCategory, ProviderError, RepositorySummary};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl RepositorySource for StaticSource {
        async fn fetch_snapshot(&self, owner: &str, name: &str) -> Result<RepositorySnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if name == "ghost" {
                return Err(RepoDocsError::github(Some(404), "Not Found"));
            }
            Ok(RepositorySnapshot::new(owner, name).with_readme("# Readme"))
        }

        async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
            Ok(Vec::new())
        }
    }

    struct SlowProvider {
        delay: Duration,
        fail: Option<ErrorCategory>,
    }

    #[async_trait]
    impl DocumentationProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-model"
        }

        async fn generate(&self, snapshot: &RepositorySnapshot) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            match self.fail {
                Some(category) => Err(ProviderError::with_provider(category, "nope", "slow").into()),
                None => Ok(format!("# {}", snapshot.name)),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn service(providers: Vec<SharedProvider>, generation_timeout: Duration) -> DocsService {
        let generator = DocumentationGenerator::with_cache(
            providers,
            TtlCache::shared(Duration::from_secs(60)),
            GeneratorConfig::default(),
        );
        DocsService::new(
            Arc::new(generator),
            GitHubConfig::default(),
            TimeoutConfig::new(Duration::from_secs(5), generation_timeout),
        )
    }

    fn source() -> StaticSource {
        StaticSource {
            fetches: AtomicUsize::new(0),
        }
    }

    fn fast() -> SharedProvider {
        Arc::new(SlowProvider {
            delay: Duration::ZERO,
            fail: None,
        })
    }

    fn token() -> SecretString {
        SecretString::from("gh-token".to_string())
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerateRequest::new("octo", "hello", token()).validate().is_ok());
        assert!(GenerateRequest::new(" ", "hello", token()).validate().is_err());
        assert!(GenerateRequest::new("octo", "", token()).validate().is_err());
        assert!(GenerateRequest::new("a".repeat(100), "hello", token()).validate().is_ok());
        assert!(matches!(
            GenerateRequest::new("a".repeat(101), "hello", token()).validate(),
            Err(RepoDocsError::InvalidRequest(_))
        ));
        assert!(GenerateRequest::new("octo", "a/b", token()).validate().is_err());
    }

    #[tokio::test]
    async fn test_generate_from_source() {
        let service = service(vec![fast()], Duration::from_secs(5));
        let source = source();

        let docs = service.generate_from(&source, "octo", "hello").await.unwrap();
        assert_eq!(docs.content, "# hello");
        assert_eq!(docs.provider, "slow");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_providers_skips_repository_fetch() {
        let service = service(Vec::new(), Duration::from_secs(5));
        let source = source();

        let err = service
            .generate_from(&source, "octo", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoDocsError::NoProvidersConfigured));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

        let response = service
            .handle(GenerateRequest::new("octo", "hello", token()))
            .await;
        match response {
            GenerationResponse::Failure { kind, retryable, .. } => {
                assert_eq!(kind, FailureKind::Configuration);
                assert!(!retryable);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_caller_timeout_is_distinct() {
        let slow: SharedProvider = Arc::new(SlowProvider {
            delay: Duration::from_millis(500),
            fail: Some(ErrorCategory::Transient),
        });
        let service = service(vec![slow], Duration::from_millis(20));

        let err = service
            .generate_from(&source(), "octo", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoDocsError::Timeout { .. }));
        assert_eq!(FailureKind::classify(&err), FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_missing_repository_is_not_found() {
        let service = service(vec![fast()], Duration::from_secs(5));
        let err = service
            .generate_from(&source(), "octo", "ghost")
            .await
            .unwrap_err();
        assert_eq!(FailureKind::classify(&err), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_request_envelope() {
        let service = service(vec![fast()], Duration::from_secs(5));
        let response = service
            .handle(GenerateRequest::new("", "hello", token()).with_repository_id(7))
            .await;

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "invalid_request");
        assert_eq!(json["retryable"], false);
        assert_eq!(json["repositoryId"], 7);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_success_envelope_is_camel_case() {
        let response = GenerationResponse::success(
            GeneratedDocumentation {
                content: "# Docs".to_string(),
                provider: "gemini".to_string(),
                cached: true,
            },
            "octo/hello",
            None,
        );
        assert!(response.is_success());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["content"], "# Docs");
        assert_eq!(json["provider"], "gemini");
        assert_eq!(json["cached"], true);
        assert!(json.get("repositoryId").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_clone_token_keeps_secret() {
        let copy = clone_token(&token());
        assert_eq!(copy.expose_secret(), "gh-token");
    }

    #[tokio::test]
    async fn test_refresh_clears_both_caches() {
        let service = service(vec![fast()], Duration::from_secs(5));
        service.generate_from(&source(), "octo", "hello").await.unwrap();
        service.snapshot_cache().insert(
            GitHubClient::snapshot_cache_key("octo/hello", &token()),
            RepositorySnapshot::new("octo", "hello"),
        );

        assert_eq!(service.refresh("octo/hello"), 1);
        assert!(service.snapshot_cache().is_empty());
        assert!(service.generator().cache().is_empty());
    }

    fn github_service(server: &mockito::ServerGuard) -> DocsService {
        let mut service = service(vec![fast()], Duration::from_secs(5));
        service.github = GitHubConfig {
            api_base: server.url(),
            ..Default::default()
        };
        service
    }

    fn repo_body(owner: &str, name: &str, private: bool) -> String {
        serde_json::json!({
            "id": 42,
            "name": name,
            "full_name": format!("{}/{}", owner, name),
            "owner": {"login": owner},
            "description": null,
            "private": private,
            "html_url": format!("https://github.com/{}/{}", owner, name),
            "language": "Rust",
            "stargazers_count": 0,
            "forks_count": 0,
            "updated_at": "2024-05-01T12:00:00Z",
            "default_branch": "main"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_private_snapshot_requires_access_per_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/alice/secret")
            .match_header("authorization", "Bearer alice-token")
            .with_status(200)
            .with_body(repo_body("alice", "secret", true))
            .create_async()
            .await;
        let denied = server
            .mock("GET", "/repos/alice/secret")
            .match_header("authorization", "Bearer mallory-token")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .expect(1)
            .create_async()
            .await;
        let service = github_service(&server);

        let owner = service
            .handle(GenerateRequest::new(
                "alice",
                "secret",
                SecretString::from("alice-token".to_string()),
            ))
            .await;
        assert!(owner.is_success());

        let other = service
            .handle(GenerateRequest::new(
                "alice",
                "secret",
                SecretString::from("mallory-token".to_string()),
            ))
            .await;
        match other {
            GenerationResponse::Failure { kind, .. } => assert_eq!(kind, FailureKind::NotFound),
            other => panic!("expected failure, got {:?}", other),
        }
        denied.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_matches_canonical_name_case_insensitively() {
        let mut server = mockito::Server::new_async().await;
        let repo = server
            .mock("GET", "/repos/Octo/Hello")
            .with_status(200)
            .with_body(repo_body("octo", "hello", false))
            .expect(2)
            .create_async()
            .await;
        let service = github_service(&server);
        let request = || GenerateRequest::new("Octo", "Hello", token());

        let first = service.handle(request()).await;
        assert!(matches!(first, GenerationResponse::Success { cached: false, .. }));
        let second = service.handle(request()).await;
        assert!(matches!(second, GenerationResponse::Success { cached: true, .. }));

        assert_eq!(service.refresh("Octo/Hello"), 1);
        assert!(service.snapshot_cache().is_empty());

        let third = service.handle(request()).await;
        assert!(matches!(third, GenerationResponse::Success { cached: false, .. }));
        repo.assert_async().await;
    }
}
