//! Repos Command
//!
//! List repositories visible to the access token, most recently updated first.

use secrecy::SecretString;
use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::github::{GitHubClient, RepositorySource};
use crate::types::{RepositorySummary, Result};

pub fn run(token: SecretString, json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let client = GitHubClient::new(token, &config.github)?;

    let rt = Runtime::new()?;
    let repos = rt.block_on(client.list_repositories())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    let output = Output::new();
    if repos.is_empty() {
        output.info("No repositories visible to this token");
        return Ok(());
    }

    output.header(&format!("Repositories ({})", repos.len()));
    for repo in &repos {
        println!("{}", summary_line(repo));
    }
    Ok(())
}

fn summary_line(repo: &RepositorySummary) -> String {
    let visibility = if repo.private { " [private]" } else { "" };
    let language = repo.language.as_deref().unwrap_or("-");
    let updated = repo
        .updated_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "  {:<40} {:<12} ★{:<6} {}{}",
        repo.full_name, language, repo.stars, updated, visibility
    )
}
