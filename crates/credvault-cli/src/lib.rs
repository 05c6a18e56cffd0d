//! CredVault command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use credvault_core::config::{Config, LoggingConfig};
use credvault_core::paths;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CredVault - manage the current user's stored credentials
#[derive(Parser)]
#[command(name = "credvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "CREDVAULT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Store a credential (prompts for the secret)
    Set(commands::credentials::SetArgs),

    /// Show a stored credential
    Get(commands::credentials::GetArgs),

    /// List stored credentials
    List(commands::credentials::ListArgs),

    /// Delete a stored credential
    Delete(commands::credentials::DeleteArgs),

    /// Split an account name into user and domain
    ParseUser {
        /// Account name, e.g. `DOMAIN\user` or `user@domain`
        account: String,
    },

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Run diagnostics
    Doctor(commands::doctor::DoctorArgs),

    /// Show version information
    Version,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
}

impl Context {
    /// Resolve the config path and load it, falling back to defaults when
    /// the file does not exist.
    pub fn load(explicit: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let config_path = paths::resolve_config_file(explicit)?;
        let config = Config::load_or_default(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins; otherwise the configured filter is used, raised to
/// `debug` or `trace` by repeated `-v`.
pub fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let fallback = match verbose {
        0 => logging.filter.clone(),
        1 => "credvault=debug".to_string(),
        _ => "credvault=trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Run the CLI with the given arguments.
pub fn run(cli: Cli, ctx: &Context) -> anyhow::Result<()> {
    match cli.command {
        Commands::Set(args) => commands::credentials::set(args, ctx),
        Commands::Get(args) => commands::credentials::get(args, ctx),
        Commands::List(args) => commands::credentials::list(args, ctx),
        Commands::Delete(args) => commands::credentials::delete(args, ctx),
        Commands::ParseUser { account } => commands::credentials::parse_user(&account, ctx),
        Commands::Config(args) => commands::config::run(args, ctx),
        Commands::Doctor(args) => commands::doctor::run(args, ctx),
        Commands::Version => {
            println!("credvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
