//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::plan::PlanArgs;
use super::commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "pacer")]
#[command(about = "Pacer - adaptive transition timing", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .pacer/config.yaml and .pacer/local.yaml)
    #[arg(short, long, global = true, env = "PACER_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how the target delay is computed for a transition
    Plan(PlanArgs),

    /// Run transitions against simulated collaborators
    Simulate(SimulateArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved configuration
    Show,
}
