//! Configuration management commands.

use clap::Args;
use hiven_core::{paths, Config};
use serde_json::Value;
use std::path::Path;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show configuration (token redacted)
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
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

/// Run the config command.
pub fn run(args: ConfigArgs, config: Config, path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
        }

        ConfigCommand::Get { key } => {
            let json = redacted(&config)?;
            match lookup(&json, &key) {
                Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }

        ConfigCommand::Init { force } => {
            let path = match path {
                Some(path) => path.to_path_buf(),
                None => paths::config_file()?,
            };

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            config.save(&path)?;
            println!("Created config file: {:?}", path);
            if config.token.is_none() {
                println!("  Tip: add a \"token\" entry or set HIVEN_TOKEN before 'hiven run'.");
            }
        }

        ConfigCommand::Path => {
            let path = match path {
                Some(path) => path.to_path_buf(),
                None => paths::config_file()?,
            };
            println!("{}", path.display());
        }

        ConfigCommand::Validate => {
            config.validate()?;
            match config.require_token() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration is valid, but {}", e),
            }
        }
    }

    Ok(())
}

/// The configuration as JSON with the token replaced.
fn redacted(config: &Config) -> anyhow::Result<Value> {
    let mut json = serde_json::to_value(config)?;
    if let Some(token) = json.get_mut("token") {
        *token = Value::String("[REDACTED]".to_string());
    }
    Ok(json)
}

/// Walk a dot-separated key path.
fn lookup<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |acc, k| acc.get(k))
}
