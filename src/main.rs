use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repodocs::cli::commands::generate::{GenerateOptions, OutputFormat};
use repodocs::config::ConfigFormat;

/// Parse `config show` output format
fn parse_config_format(s: &str) -> Result<ConfigFormat, String> {
    match s.to_lowercase().as_str() {
        "toml" | "text" => Ok(ConfigFormat::Toml),
        "json" => Ok(ConfigFormat::Json),
        _ => Err(format!("Invalid format '{}'. Valid values: toml, json", s)),
    }
}

#[derive(Parser)]
#[command(name = "repodocs")]
#[command(
    version,
    about = "AI-generated documentation for GitHub repositories with provider fallback"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for one or more repositories
    Generate {
        #[arg(required = true, help = "Repositories as owner/name")]
        repositories: Vec<String>,
        #[arg(
            long,
            env = "GITHUB_TOKEN",
            hide_env_values = true,
            help = "GitHub access token"
        )]
        token: String,
        #[arg(long, help = "Discard cached snapshot and documentation first")]
        refresh: bool,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },

    /// List repositories visible to the access token
    Repos {
        #[arg(
            long,
            env = "GITHUB_TOKEN",
            hide_env_values = true,
            help = "GitHub access token"
        )]
        token: String,
        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },

    /// Show configured providers
    Providers {
        #[arg(long, help = "Probe each usable provider's API")]
        check: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            value_parser = parse_config_format,
            help = "Output format: toml, json"
        )]
        format: ConfigFormat,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mrepodocs encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        eprintln!("\n\x1b[33mPlease report this issue at:\x1b[0m");
        eprintln!("  https://github.com/junyeong-ai/repodocs/issues");
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs go to stderr so generated Markdown on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            repositories,
            token,
            refresh,
            format,
        } => {
            let total = repositories.len();
            let failed = repodocs::cli::commands::generate::run(GenerateOptions {
                repositories,
                token: SecretString::from(token),
                refresh,
                format,
            })?;
            if failed > 0 {
                anyhow::bail!("{} of {} repositories failed", failed, total);
            }
        }
        Commands::Repos { token, json } => {
            repodocs::cli::commands::repos::run(SecretString::from(token), json)?;
        }
        Commands::Providers { check } => {
            repodocs::cli::commands::providers::run(check)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                repodocs::cli::commands::config::show(format)?;
            }
            ConfigAction::Path => {
                repodocs::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                repodocs::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
