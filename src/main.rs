//! Pacer CLI entry point.

use anyhow::Result;
use clap::Parser;

use pacer::cli::{commands, Cli, Commands};
use pacer::domain::models::Config;
use pacer::infrastructure::config::ConfigLoader;
use pacer::infrastructure::logging::{LogConfig, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &config, cli.json),
        Commands::Simulate(args) => commands::simulate::execute(args, &config, cli.json).await,
        Commands::Config(command) => commands::config::execute(command, &config, cli.json),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        pacer::cli::handle_error(err, json_mode);
    }
}
