//! Timeout Configuration
//!
//! Two layers of deadlines:
//! - a per-request timeout on every upstream HTTP client
//! - a caller-level deadline around a whole generation request
//!
//! When the caller-level deadline fires the in-flight chain (provider calls,
//! retries, backoff sleeps) is dropped and [`RepoDocsError::Timeout`] is
//! returned instead of whatever provider error was pending.
//!
//! ## Usage
//!
//! ```ignore
//! let config = TimeoutConfig::default();
//! let docs = with_timeout(
//!     config.generation,
//!     generator.generate_documentation(&snapshot),
//!     "documentation generation",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::network as net_constants;
use crate::types::{RepoDocsError, Result};

/// Timeout configuration for upstream calls and whole requests
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for one upstream HTTP request (default: 45 seconds)
    pub request: Duration,
    /// Deadline for a full generation request (default: 5 minutes)
    pub generation: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(net_constants::REQUEST_TIMEOUT_SECS),
            generation: Duration::from_secs(net_constants::GENERATION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn new(request: Duration, generation: Duration) -> Self {
        Self {
            request,
            generation,
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns [`RepoDocsError::Timeout`] if the operation doesn't complete
/// within `timeout`; the operation future is dropped at that point.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(RepoDocsError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, ProviderError};

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.request.as_secs(), 45);
        assert_eq!(config.generation.as_secs(), 300);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, RepoDocsError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, RepoDocsError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result, Err(RepoDocsError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_timeout_masks_pending_provider_error() {
        // A chain still retrying when the deadline fires reports the timeout,
        // not the provider failure it was about to surface.
        let result: Result<()> = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err(ProviderError::new(ErrorCategory::Transient, "503").into())
            },
            "generation",
        )
        .await;
        match result {
            Err(RepoDocsError::Timeout { operation, .. }) => assert_eq!(operation, "generation"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
