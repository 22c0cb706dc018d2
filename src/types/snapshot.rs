//! Repository snapshot types
//!
//! A snapshot is the immutable generation input: metadata, the root file
//! tree, README text and well-known manifest files.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    #[serde(alias = "dir")]
    Directory,
}

/// One entry of the repository file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn file(path: &str, size: u64) -> Self {
        Self {
            name: file_name(path),
            path: path.to_string(),
            kind: FileKind::File,
            size: Some(size),
        }
    }

    pub fn directory(path: &str) -> Self {
        Self {
            name: file_name(path),
            path: path.to_string(),
            kind: FileKind::Directory,
            size: None,
        }
    }
}

fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Point-in-time bundle of repository data used as generation input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub owner: String,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub default_branch: Option<String>,
    pub html_url: Option<String>,
    pub file_tree: Vec<FileEntry>,
    pub readme: Option<String>,
    /// Manifest filename -> content. Ordered so prompts are reproducible.
    pub manifest_files: BTreeMap<String, String>,
}

impl RepositorySnapshot {
    /// Minimal snapshot, mostly useful for tests and offline runs
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            description: None,
            language: None,
            stars: 0,
            forks: 0,
            updated_at: None,
            default_branch: None,
            html_url: None,
            file_tree: Vec::new(),
            readme: None,
            manifest_files: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_counts(mut self, stars: u64, forks: u64) -> Self {
        self.stars = stars;
        self.forks = forks;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_files(mut self, files: Vec<FileEntry>) -> Self {
        self.file_tree = files;
        self
    }

    pub fn with_readme(mut self, readme: &str) -> Self {
        self.readme = Some(readme.to_string());
        self
    }

    pub fn with_manifest(mut self, filename: &str, content: &str) -> Self {
        self.manifest_files
            .insert(filename.to_string(), content.to_string());
        self
    }

    /// Freshness marker used in cache keys
    pub fn freshness_marker(&self) -> Option<String> {
        self.updated_at.map(|t| t.timestamp().to_string())
    }
}

/// Repository listing entry for the authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub html_url: String,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub default_branch: Option<String>,
}
