//! Implementation of the `pacer config` commands.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::ConfigCommands;
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    #[serde(flatten)]
    pub config: Config,
    #[serde(skip)]
    yaml: String,
}

impl ConfigShowOutput {
    pub fn new(config: &Config) -> Result<Self> {
        let yaml = serde_yaml::to_string(config).context("Failed to render configuration")?;
        Ok(Self {
            config: config.clone(),
            yaml,
        })
    }
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        self.yaml.trim_end().to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(command: ConfigCommands, config: &Config, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => output(&ConfigShowOutput::new(config)?, json_mode),
    }
    Ok(())
}
