//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/repodocs/config.toml)
//! 3. Project config (.repodocs/config.toml)
//! 4. Environment variables (REPODOCS_* prefix, `__` separates sections)

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{RepoDocsError, Result};

const APP_DIR: &str = "repodocs";
const PROJECT_DIR: &str = ".repodocs";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "REPODOCS_";

/// Output format for `config show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .map_err(|e| RepoDocsError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (defaults still apply)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(RepoDocsError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| RepoDocsError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // REPODOCS_GENERATION__CACHE_TTL_SECS -> generation.cache_ttl_secs
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory: `$XDG_CONFIG_HOME/repodocs`, else `~/.config/repodocs`
    pub fn global_dir() -> Option<PathBuf> {
        env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|dirs| dirs.home_dir().join(".config")))
            .map(|p| p.join(APP_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
        println!();
        println!("  Environment overrides: {}<SECTION>__<KEY>", ENV_PREFIX);
    }

    /// Render the effective configuration. API keys are never serialized.
    pub fn render(config: &Config, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| RepoDocsError::Config(e.to_string()))
            }
        }
    }

    /// Show current effective configuration
    pub fn show_config(format: ConfigFormat) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render(&config, format)?);
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default global config; returns the file path
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            RepoDocsError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, force)
    }

    /// Write the default project config; returns the file path
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(&Self::project_dir(), force)
    }

    fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(config_path)
    }

    /// Default config file content (TOML)
    fn default_config() -> String {
        r#"# repodocs configuration
# Project settings in .repodocs/config.toml override ~/.config/repodocs/config.toml.
# Environment variables override both, e.g. REPODOCS_GENERATION__CACHE_TTL_SECS=600

version = "1.0"

[github]
api_base = "https://api.github.com"
timeout_secs = 45
snapshot_ttl_secs = 600

[generation]
# Failover budget: attempts = providers * max_provider_attempts
max_provider_attempts = 2
cache_ttl_secs = 1800
timeout_secs = 300
cache_sweep_secs = 600

[generation.retry]
max_attempts = 3
base_delay_ms = 1000

[providers]
order = ["gemini", "openrouter", "mistral"]

# API keys are read from GOOGLE_GEMINI_API_KEY, OPENROUTER_API_KEY and
# MISTRAL_API_KEY unless api_key_env names another variable.
[providers.gemini]
enabled = true
model = "gemini-1.5-flash"

[providers.openrouter]
enabled = true
model = "meta-llama/llama-3.1-8b-instruct:free"

[providers.mistral]
enabled = true
model = "mistral-large-latest"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderKind;
    use figment::Jail;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.version, "1.0");
            assert_eq!(config.generation.max_provider_attempts, 2);
            Ok(())
        });
    }

    #[test]
    fn test_project_overrides_global() {
        Jail::expect_with(|jail| {
            let xdg = jail.directory().join("xdg");
            jail.set_env("XDG_CONFIG_HOME", xdg.display());

            fs::create_dir_all(xdg.join(APP_DIR)).unwrap();
            fs::write(
                xdg.join(APP_DIR).join(CONFIG_FILE),
                "[generation]\ncache_ttl_secs = 60\nmax_provider_attempts = 4\n",
            )
            .unwrap();

            fs::create_dir_all(PROJECT_DIR).unwrap();
            jail.create_file(
                ".repodocs/config.toml",
                "[generation]\ncache_ttl_secs = 120\n\n[providers]\norder = [\"mistral\"]\n",
            )?;

            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.generation.cache_ttl_secs, 120);
            assert_eq!(config.generation.max_provider_attempts, 4);
            assert_eq!(config.providers.order, vec![ProviderKind::Mistral]);
            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.set_env("REPODOCS_GENERATION__CACHE_TTL_SECS", "42");
            jail.set_env("REPODOCS_PROVIDERS__GEMINI__MODEL", "gemini-2.0-flash");

            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.generation.cache_ttl_secs, 42);
            assert_eq!(config.providers.gemini.model.as_deref(), Some("gemini-2.0-flash"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.set_env("REPODOCS_GENERATION__MAX_PROVIDER_ATTEMPTS", "0");

            let err = ConfigLoader::load().unwrap_err();
            assert!(matches!(err, RepoDocsError::Config(_)));
            Ok(())
        });
    }

    #[test]
    fn test_default_template_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::write_default(temp_dir.path(), false).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.providers.order, ProviderKind::ALL.to_vec());
        assert_eq!(config.generation.retry.max_attempts, 3);
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "version = \"custom\"\n").unwrap();

        ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = \"custom\"\n");

        ConfigLoader::write_default(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[providers.gemini]"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        let toml = ConfigLoader::render(&config, ConfigFormat::Toml).unwrap();
        assert!(toml.contains("[generation]"));

        let json = ConfigLoader::render(&config, ConfigFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["generation"]["max_provider_attempts"], 2);
    }
}
