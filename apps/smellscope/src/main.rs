//! smellscope binary entry point

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use smell_config::{logging, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    logging::initialize(&config);

    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        host: None,
    });
    cli::run(command, config).await
}
