//! Providers Command
//!
//! Show the configured rotation and, with `--check`, probe each usable
//! provider's API concurrently.

use futures::future::join_all;
use tokio::runtime::Runtime;

use crate::ai::provider::{ProviderKind, ProviderRegistry, SharedProvider};
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

pub fn run(check: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let output = Output::new();

    output.header("Providers");
    for kind in rotation(&config) {
        describe(&output, &config, kind);
    }

    let registry = ProviderRegistry::from_config(&config.providers, &config.generation);
    if registry.is_empty() {
        output.warning("No provider is usable; set an API key to enable one");
        return Ok(());
    }
    output.info(&format!("Rotation: {}", registry.names().join(" → ")));

    if check {
        output.section("Health checks");
        let rt = Runtime::new()?;
        for (name, healthy) in rt.block_on(check_all(registry.providers())) {
            match healthy {
                Ok(true) => output.success(&name),
                Ok(false) => output.warning(&format!("{}: unhealthy", name)),
                Err(e) => output.error(&format!("{}: {}", name, e)),
            }
        }
    }
    Ok(())
}

/// Configured order first, then any remaining vendors
fn rotation(config: &Config) -> Vec<ProviderKind> {
    let mut kinds: Vec<ProviderKind> = Vec::with_capacity(ProviderKind::ALL.len());
    for kind in config.providers.order.iter().chain(ProviderKind::ALL.iter()) {
        if !kinds.contains(kind) {
            kinds.push(*kind);
        }
    }
    kinds
}

fn describe(output: &Output, config: &Config, kind: ProviderKind) {
    let provider = config.providers.get(kind);
    let in_order = config.providers.order.contains(&kind);
    let has_key = provider.has_credential(kind.credential_env());
    let status = match (provider.enabled && in_order, has_key) {
        (false, _) => "disabled",
        (true, false) => "missing credential",
        (true, true) => "ready",
    };

    output.section(kind.as_str());
    output.field("status", status);
    output.field("model", provider.model.as_deref().unwrap_or("(default)"));
    output.field("credential", provider.credential_env(kind.credential_env()));
    if let Some(base) = &provider.api_base {
        output.field("endpoint", base);
    }
}

async fn check_all(providers: &[SharedProvider]) -> Vec<(String, Result<bool>)> {
    let checks = providers.iter().map(|provider| async move {
        let label = format!("{} ({})", provider.name(), provider.model());
        (label, provider.health_check().await)
    });
    join_all(checks).await
}
