//! Hiven command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use hiven_core::config::{LogFormat, LogLevel, LoggingConfig};
use hiven_core::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Hiven - gateway client for Hiven bots
#[derive(Parser)]
#[command(name = "hiven")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "HIVEN_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the gateway and log events until Ctrl-C
    Run(commands::run::RunArgs),

    /// Fetch a user over the REST API
    User {
        /// User ID
        id: String,
    },

    /// Send a message into a room
    Send {
        /// Room ID
        room: String,

        /// Message content
        content: String,
    },

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments and loaded configuration.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => commands::run::run(args, config).await,
        Commands::User { id } => commands::api::user(&config, &id).await,
        Commands::Send { room, content } => commands::api::send(&config, &room, &content).await,
        Commands::Config(args) => commands::config::run(args, config, cli.config.as_deref()),
        Commands::Version => {
            println!("hiven {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Filter directive used when `RUST_LOG` is unset.
///
/// Each `-v` raises the configured level by one step.
pub fn default_directive(verbose: u8, level: LogLevel) -> String {
    const LEVELS: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];
    let base = LEVELS.iter().position(|l| *l == level).unwrap_or(2);
    let index = (base + verbose as usize).min(LEVELS.len() - 1);
    format!("hiven={}", LEVELS[index].as_str())
}

/// Install the global tracing subscriber.
pub fn init_logging(verbose: u8, logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(verbose, logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}
