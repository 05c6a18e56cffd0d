//! Configuration management commands.

use crate::Context;
use clap::Args;
use credvault_core::config::Config;
use serde_json::Value;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Walk a dot-separated path through a JSON document.
pub fn get_path<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |acc, k| acc.get(k))
}

/// Set a dot-separated path, creating intermediate objects as needed.
///
/// The value is parsed as JSON first (numbers, booleans) and falls back to a
/// plain string.
pub fn set_path(json: &mut Value, key: &str, value: &str) {
    let parts: Vec<&str> = key.split('.').collect();
    let mut current = json;
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            let parsed: Value =
                serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            current[part] = parsed;
        } else {
            if !current.get(part).map_or(false, |v| v.is_object()) {
                current[part] = serde_json::json!({});
            }
            current = &mut current[part];
        }
    }
}

/// Apply `key = value` to `config`, rejecting keys the schema does not know
/// and results that no longer fit the schema or fail validation.
pub fn apply_set(config: &Config, key: &str, value: &str) -> anyhow::Result<Config> {
    let mut json = serde_json::to_value(config)?;
    if get_path(&json, key).is_none() {
        anyhow::bail!("Unknown configuration key: {}", key);
    }
    set_path(&mut json, key, value);

    let updated: Config = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid configuration after set: {}", e))?;
    updated.validate()?;
    Ok(updated)
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(&ctx.config)?;
            println!("{}", json);
        }

        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(&ctx.config)?;
            match get_path(&json, &key) {
                Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }

        ConfigCommand::Set { key, value } => {
            let updated = apply_set(&ctx.config, &key, &value)?;
            updated.save(&ctx.config_path)?;
            println!("Set {} = {}", key, value);
        }

        ConfigCommand::Init { force } => {
            let path = &ctx.config_path;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            Config::default().save(path)?;
            println!("Created config file: {:?}", path);
        }

        ConfigCommand::Path => {
            println!("{}", ctx.config_path.display());
        }

        ConfigCommand::Validate => match Config::load(&ctx.config_path) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            },
            Err(e) => anyhow::bail!("Failed to load config: {}", e),
        },
    }

    Ok(())
}
