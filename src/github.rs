//! GitHub Repository Source
//!
//! Fetches repository snapshots over the GitHub REST API with a caller
//! supplied token. Only the repository metadata call is fatal; the root
//! listing, README and manifest probes degrade to empty values so a sparse
//! repository still produces a usable snapshot.
//!
//! Snapshots are cached under `repo:{full_name}:{token fingerprint}` for the
//! configured TTL. The name is lowercased since GitHub resolves it case
//! insensitively; the fingerprint keeps one token's snapshot from being served
//! to a token that cannot read the repository.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::cache::{SharedCache, TtlCache};
use crate::config::GitHubConfig;
use crate::constants::{
    cache as cache_constants, github as github_constants, network as net_constants,
};
use crate::types::{
    FileEntry, FileKind, RepoDocsError, RepositorySnapshot, RepositorySummary, Result,
};

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const API_VERSION: &str = "2022-11-28";

/// Where repository snapshots come from
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Snapshot of `owner/name`; a missing repository is an error
    async fn fetch_snapshot(&self, owner: &str, name: &str) -> Result<RepositorySnapshot>;

    /// Repositories visible to the token, most recently updated first
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>>;
}

/// GitHub REST client with snapshot caching
pub struct GitHubClient {
    token: SecretString,
    api_base: url::Url,
    client: reqwest::Client,
    snapshots: SharedCache<RepositorySnapshot>,
    snapshot_ttl: Duration,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base.as_str())
            .field("cached_snapshots", &self.snapshots.len())
            .finish()
    }
}

impl GitHubClient {
    pub fn new(token: SecretString, config: &GitHubConfig) -> Result<Self> {
        if token.expose_secret().trim().is_empty() {
            return Err(RepoDocsError::Config("GitHub access token is empty".to_string()));
        }

        let api_base = url::Url::parse(&config.api_base).map_err(|e| {
            RepoDocsError::Config(format!("Invalid GitHub API base '{}': {}", config.api_base, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(net_constants::USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| RepoDocsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            token,
            api_base,
            client,
            snapshots: TtlCache::shared(config.snapshot_ttl()),
            snapshot_ttl: config.snapshot_ttl(),
        })
    }

    /// Share a snapshot cache with other clients
    pub fn with_cache(mut self, cache: SharedCache<RepositorySnapshot>) -> Self {
        self.snapshots = cache;
        self
    }

    pub fn cache(&self) -> &SharedCache<RepositorySnapshot> {
        &self.snapshots
    }

    /// Prefix shared by every token's snapshot of one repository
    pub fn snapshot_cache_prefix(full_name: &str) -> String {
        format!("{}:{}:", cache_constants::REPO_PREFIX, full_name.to_lowercase())
    }

    /// Snapshot key for one repository as seen by one token
    pub fn snapshot_cache_key(full_name: &str, token: &SecretString) -> String {
        format!(
            "{}{}",
            Self::snapshot_cache_prefix(full_name),
            token_fingerprint(token)
        )
    }

    /// Forget cached snapshots of one repository for all tokens
    pub fn invalidate(&self, full_name: &str) -> usize {
        self.snapshots.delete_prefix(&Self::snapshot_cache_prefix(full_name))
    }

    /// API URL with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RepoDocsError::Config(format!("GitHub API base cannot be a base URL: {}", self.api_base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, url: url::Url, accept: &'static str) -> Result<reqwest::Response> {
        debug!(url = %url, "GitHub request");
        self.client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| RepoDocsError::github(None, format!("Request failed: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = self.send(self.endpoint(segments)?, JSON_MEDIA_TYPE).await?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RepoDocsError::github(None, format!("Failed to parse response: {}", e)))
    }

    /// Raw file body, `None` when the file does not exist
    async fn get_raw(&self, segments: &[&str]) -> Result<Option<String>> {
        let response = self.send(self.endpoint(segments)?, RAW_MEDIA_TYPE).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| RepoDocsError::github(None, format!("Failed to read body: {}", e)))?;
        Ok(Some(text))
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<RepoResponse> {
        self.get_json(&["repos", owner, name]).await
    }

    /// Root directory listing; failures degrade to an empty tree
    pub async fn root_contents(&self, owner: &str, name: &str) -> Vec<FileEntry> {
        match self
            .get_json::<Vec<ContentItem>>(&["repos", owner, name, "contents"])
            .await
        {
            Ok(items) => items.into_iter().map(FileEntry::from).collect(),
            Err(e) => {
                warn!(repository = %format!("{}/{}", owner, name), error = %e, "Failed to list repository contents");
                Vec::new()
            }
        }
    }

    pub async fn readme(&self, owner: &str, name: &str) -> Option<String> {
        optional_file(self.get_raw(&["repos", owner, name, "readme"]).await, "README")
    }

    pub async fn file_content(&self, owner: &str, name: &str, path: &str) -> Option<String> {
        let mut segments = vec!["repos", owner, name, "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        optional_file(self.get_raw(&segments).await, path)
    }

    async fn manifests(&self, owner: &str, name: &str) -> Vec<(String, String)> {
        let fetches = github_constants::MANIFEST_FILES.iter().map(|file| async move {
            self.file_content(owner, name, file)
                .await
                .map(|content| (file.to_string(), content))
        });
        join_all(fetches).await.into_iter().flatten().collect()
    }

    async fn fetch_uncached(&self, owner: &str, name: &str) -> Result<RepositorySnapshot> {
        let repo = self.repository(owner, name).await?;

        let (file_tree, readme, manifests) = futures::join!(
            self.root_contents(owner, name),
            self.readme(owner, name),
            self.manifests(owner, name),
        );

        let mut snapshot = RepositorySnapshot::new(&repo.owner.login, &repo.name);
        snapshot.full_name = repo.full_name;
        snapshot.description = repo.description;
        snapshot.language = repo.language;
        snapshot.stars = repo.stargazers_count;
        snapshot.forks = repo.forks_count;
        snapshot.updated_at = repo.updated_at;
        snapshot.default_branch = repo.default_branch;
        snapshot.html_url = Some(repo.html_url);
        snapshot.file_tree = file_tree;
        snapshot.readme = readme;
        snapshot.manifest_files = manifests.into_iter().collect();
        Ok(snapshot)
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    #[instrument(skip(self))]
    async fn fetch_snapshot(&self, owner: &str, name: &str) -> Result<RepositorySnapshot> {
        let key = Self::snapshot_cache_key(&format!("{}/{}", owner, name), &self.token);
        if let Some(snapshot) = self.snapshots.get(&key) {
            debug!("Using cached repository snapshot");
            return Ok(snapshot);
        }

        let snapshot = self.fetch_uncached(owner, name).await?;
        info!(
            files = snapshot.file_tree.len(),
            manifests = snapshot.manifest_files.len(),
            has_readme = snapshot.readme.is_some(),
            "Fetched repository snapshot"
        );
        self.snapshots.set(key, snapshot.clone(), self.snapshot_ttl);
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let mut url = self.endpoint(&["user", "repos"])?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", &github_constants::REPOS_PER_PAGE.to_string());

        let response = check_status(self.send(url, JSON_MEDIA_TYPE).await?).await?;
        let repos: Vec<RepoResponse> = response
            .json()
            .await
            .map_err(|e| RepoDocsError::github(None, format!("Failed to parse response: {}", e)))?;

        Ok(repos.into_iter().map(RepositorySummary::from).collect())
    }
}

/// Short hex digest of a token, never the token itself
fn token_fingerprint(token: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.expose_secret().as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

fn optional_file(result: Result<Option<String>>, what: &str) -> Option<String> {
    match result {
        Ok(content) => content,
        Err(e) => {
            warn!(file = what, error = %e, "Failed to fetch optional file");
            None
        }
    }
}

/// Map a non-2xx response to `RepoDocsError::GitHub`, using the API's `message` field
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });
    Err(RepoDocsError::github(Some(status.as_u16()), message))
}

// Response types

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    id: u64,
    name: String,
    full_name: String,
    owner: OwnerResponse,
    description: Option<String>,
    #[serde(default)]
    private: bool,
    html_url: String,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    updated_at: Option<DateTime<Utc>>,
    default_branch: Option<String>,
}

impl From<RepoResponse> for RepositorySummary {
    fn from(repo: RepoResponse) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            private: repo.private,
            html_url: repo.html_url,
            language: repo.language,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            updated_at: repo.updated_at,
            default_branch: repo.default_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    item_type: String,
    size: Option<u64>,
}

impl From<ContentItem> for FileEntry {
    fn from(item: ContentItem) -> Self {
        let kind = if item.item_type == "dir" {
            FileKind::Directory
        } else {
            FileKind::File
        };
        Self {
            name: item.name,
            path: item.path,
            size: if kind == FileKind::File { item.size } else { None },
            kind,
        }
    }
}
