pub mod error;
pub mod snapshot;

pub use error::{
    ErrorCategory, ErrorClassifier, FailureKind, ProviderError, RepoDocsError, Result,
};
pub use snapshot::{FileEntry, FileKind, RepositorySnapshot, RepositorySummary};
