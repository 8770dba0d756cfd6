use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::errors::ConfigError;
use crate::domain::models::config::Config;

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .pacer/config.yaml (project config)
    /// 3. .pacer/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PACER_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            // 1. Start with programmatic defaults
            .merge(Serialized::defaults(Config::default()))
            // 2. Merge project config
            .merge(Yaml::file(".pacer/config.yaml"))
            // 3. Merge project local overrides (optional, for dev/test overrides)
            .merge(Yaml::file(".pacer/local.yaml"))
            // 4. Merge environment variables (highest priority)
            .merge(Env::prefixed("PACER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("PACER_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Delay bounds
        config.transition.validate()?;

        // Timing
        let timing = &config.timing;
        for (field, value) in [
            ("executor_timeout_ms", timing.executor_timeout_ms),
            ("best_effort_cap_ms", timing.best_effort_cap_ms),
            ("poll_interval_ms", timing.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }

        // Reporting
        let reporting = &config.reporting;
        if reporting.interval_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "reporting.interval_secs",
            });
        }
        if reporting.window == 0 || reporting.history_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "reporting window and history_capacity must be at least 1".to_string(),
            ));
        }
        if reporting.window > reporting.history_capacity {
            return Err(ConfigError::ValidationFailed(format!(
                "reporting window ({}) cannot exceed history_capacity ({})",
                reporting.window, reporting.history_capacity
            )));
        }
        if !(0.0..=1.0).contains(&reporting.min_success_rate) {
            return Err(ConfigError::InvalidSuccessRate(
                reporting.min_success_rate.to_string(),
            ));
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log format: {}. Must be one of: json, pretty",
                config.logging.format
            )));
        }

        Ok(())
    }
}
