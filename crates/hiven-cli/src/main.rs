//! Hiven CLI entry point.

use clap::Parser;
use hiven_cli::{init_logging, run, Cli};
use hiven_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging settings come from the config, so load it first
    let config = Config::load_with_env(cli.config.as_deref());
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.verbose, &logging);

    // Run the command
    run(cli, config?).await
}
