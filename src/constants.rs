//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Provider rotation constants
pub mod rotation {
    /// How many full passes over the provider list a single request may make
    pub const MAX_PROVIDER_ATTEMPTS: usize = 2;
}

/// Per-provider retry constants
pub mod retry {
    /// Attempts per provider call, including the first one
    pub const MAX_ATTEMPTS: usize = 3;

    /// Linear backoff unit: the delay after attempt `n` is `n * BASE_DELAY_MS`
    pub const BASE_DELAY_MS: u64 = 1000;
}

/// Cache constants
pub mod cache {
    /// Generated documentation lifetime (30 minutes)
    pub const DOCUMENTATION_TTL_SECS: u64 = 30 * 60;

    /// Repository snapshot lifetime (10 minutes)
    pub const SNAPSHOT_TTL_SECS: u64 = 10 * 60;

    /// Default lifetime for untyped inserts (5 minutes)
    pub const DEFAULT_TTL_SECS: u64 = 5 * 60;

    /// Expired entry sweep interval (10 minutes)
    pub const SWEEP_INTERVAL_SECS: u64 = 10 * 60;

    /// Key prefix for generated documentation
    pub const DOCS_PREFIX: &str = "docs";

    /// Key prefix for repository snapshots
    pub const REPO_PREFIX: &str = "repo";
}

/// Prompt constants
pub mod prompt {
    /// README characters embedded in the prompt
    pub const README_MAX_CHARS: usize = 8000;

    /// Characters per manifest file embedded in the prompt
    pub const MANIFEST_MAX_CHARS: usize = 4000;

    /// File tree entries embedded in the prompt
    pub const MAX_TREE_ENTRIES: usize = 200;
}

/// GitHub collaborator constants
pub mod github {
    pub const DEFAULT_API_BASE: &str = "https://api.github.com";

    /// Manifest files probed at the repository root
    pub const MANIFEST_FILES: &[&str] = &[
        "package.json",
        "requirements.txt",
        "Cargo.toml",
        "pom.xml",
        "composer.json",
    ];

    /// Repositories listed per request
    pub const REPOS_PER_PAGE: u32 = 100;

    /// Maximum length of owner and repository names accepted by the service
    pub const MAX_NAME_LEN: usize = 100;
}

/// HTTP/Network constants
pub mod network {
    /// Per-request timeout for upstream HTTP calls (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 45;

    /// Caller-level deadline for a whole generation request (seconds)
    pub const GENERATION_TIMEOUT_SECS: u64 = 300;

    pub const USER_AGENT: &str = concat!("repodocs/", env!("CARGO_PKG_VERSION"));
}
