//! Command-line interface
//!
//! Thin layer over [`crate::service::DocsService`]: each command loads the
//! configuration, drives one async runtime and renders results with
//! [`ui::Output`].

pub mod commands;
pub mod ui;

use crate::types::{RepoDocsError, Result};

/// Split an `owner/name` argument into its parts
pub fn parse_repository(spec: &str) -> Result<(String, String)> {
    let trimmed = spec.trim().trim_end_matches(".git");
    match trimmed.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(RepoDocsError::InvalidRequest(format!(
            "Expected repository as owner/name, got '{}'",
            spec
        ))),
    }
}
