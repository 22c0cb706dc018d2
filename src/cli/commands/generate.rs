//! Generate Command
//!
//! Generate documentation for one or more repositories in a single process,
//! so repeated repositories are served from the documentation cache.
//!
//! Usage:
//!   repodocs generate owner/name [owner/name...] [--refresh] [--format json|yaml|markdown]

use clap::ValueEnum;
use secrecy::SecretString;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::cli::parse_repository;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::service::{DocsService, GenerateRequest, GenerationResponse, clone_token};
use crate::types::{RepoDocsError, Result};

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Generated Markdown only; failures go to stderr
    #[default]
    Markdown,
    /// Response envelope as JSON
    Json,
    /// Response envelope as YAML
    Yaml,
}

pub struct GenerateOptions {
    pub repositories: Vec<String>,
    pub token: SecretString,
    pub refresh: bool,
    pub format: OutputFormat,
}

/// Run the command; returns the number of repositories that failed
pub fn run(options: GenerateOptions) -> Result<usize> {
    let config = ConfigLoader::load()?;

    // Reject malformed arguments before any network traffic
    let targets = options
        .repositories
        .iter()
        .map(|spec| parse_repository(spec))
        .collect::<Result<Vec<_>>>()?;

    let rt = Runtime::new()?;
    rt.block_on(generate_all(&config, targets, options))
}

async fn generate_all(
    config: &Config,
    targets: Vec<(String, String)>,
    options: GenerateOptions,
) -> Result<usize> {
    let service = DocsService::from_config(config);
    let sweepers = service.spawn_cache_sweepers(config.generation.sweep_interval());
    let output = Output::new();
    let multiple = targets.len() > 1;

    info!(
        "Providers in rotation: {}",
        service.generator().available_providers().join(", ")
    );

    let mut responses = Vec::with_capacity(targets.len());
    for (owner, name) in targets {
        if options.refresh {
            let removed = service.refresh(&format!("{}/{}", owner, name));
            debug!("Cleared {} cached documents for {}/{}", removed, owner, name);
        }

        let request = GenerateRequest::new(owner, name, clone_token(&options.token));
        let response = service.handle(request).await;

        if options.format == OutputFormat::Markdown {
            render_markdown(&output, &response, multiple);
        }
        responses.push(response);
    }

    for sweeper in sweepers {
        sweeper.abort();
    }

    match options.format {
        OutputFormat::Markdown => {}
        OutputFormat::Json => {
            let rendered = if responses.len() == 1 {
                serde_json::to_string_pretty(&responses[0])?
            } else {
                serde_json::to_string_pretty(&responses)?
            };
            println!("{}", rendered);
        }
        OutputFormat::Yaml => {
            let rendered = if responses.len() == 1 {
                serde_yaml::to_string(&responses[0])
            } else {
                serde_yaml::to_string(&responses)
            }
            .map_err(|e| RepoDocsError::Config(format!("YAML rendering failed: {}", e)))?;
            print!("{}", rendered);
        }
    }

    Ok(responses.iter().filter(|r| !r.is_success()).count())
}

fn render_markdown(output: &Output, response: &GenerationResponse, multiple: bool) {
    match response {
        GenerationResponse::Success {
            content,
            provider,
            cached,
            repository,
            ..
        } => {
            if multiple {
                output.rule(repository);
            }
            println!("{}", content);
            let origin = if *cached { "cache" } else { "fresh" };
            info!("{}: {} ({})", repository, provider, origin);
        }
        GenerationResponse::Failure {
            error,
            kind,
            retryable,
            repository,
            ..
        } => {
            let hint = if *retryable { ", retryable" } else { "" };
            output.error(&format!("{}: {} [{}{}]", repository, error, kind, hint));
        }
    }
}
