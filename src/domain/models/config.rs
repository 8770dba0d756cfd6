use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::ConfigError;

/// Main configuration structure for Pacer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Delay planning configuration (reconfigurable at runtime)
    #[serde(default)]
    pub transition: TransitionConfig,

    /// Timeouts and polling intervals (fixed per orchestrator)
    #[serde(default)]
    pub timing: TimingConfig,

    /// Metrics history and periodic reporting
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Largest accepted `max_delay_ms`. Also bounds min and target through the
/// ordering invariant.
pub const MAX_DELAY_CEILING_MS: u64 = 60_000;

/// Delay planning configuration.
///
/// Invariant: `min_delay_ms <= target_delay_ms <= max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransitionConfig {
    /// Lower bound for any planned delay
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound for any planned delay, also the scoring-wait ceiling
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Baseline delay before adjustments
    #[serde(default = "default_target_delay_ms")]
    pub target_delay_ms: u64,

    /// Average deviation above which reports are flagged
    #[serde(default = "default_adaptive_threshold_ms")]
    pub adaptive_threshold_ms: u64,

    /// Compensate targets using recent deviation
    #[serde(default = "default_true")]
    pub enable_adaptive: bool,

    /// Run content preloading during the upstream wait
    #[serde(default = "default_true")]
    pub enable_preloading: bool,

    /// Log phase changes at info instead of debug
    #[serde(default)]
    pub debug: bool,
}

const fn default_min_delay_ms() -> u64 {
    1500
}

const fn default_max_delay_ms() -> u64 {
    4000
}

const fn default_target_delay_ms() -> u64 {
    2500
}

const fn default_adaptive_threshold_ms() -> u64 {
    500
}

const fn default_true() -> bool {
    true
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            target_delay_ms: default_target_delay_ms(),
            adaptive_threshold_ms: default_adaptive_threshold_ms(),
            enable_adaptive: true,
            enable_preloading: true,
            debug: false,
        }
    }
}

impl TransitionConfig {
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_delay_ms > MAX_DELAY_CEILING_MS {
            return Err(ConfigError::DelayAboveCeiling {
                value: self.max_delay_ms,
                limit: MAX_DELAY_CEILING_MS,
            });
        }
        if self.min_delay_ms > self.target_delay_ms || self.target_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidDelayBounds {
                min: self.min_delay_ms,
                target: self.target_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(())
    }

    /// Apply the fields set in `patch`, leaving the rest untouched.
    pub fn merged(&self, patch: &TransitionConfigPatch) -> Self {
        Self {
            min_delay_ms: patch.min_delay_ms.unwrap_or(self.min_delay_ms),
            max_delay_ms: patch.max_delay_ms.unwrap_or(self.max_delay_ms),
            target_delay_ms: patch.target_delay_ms.unwrap_or(self.target_delay_ms),
            adaptive_threshold_ms: patch
                .adaptive_threshold_ms
                .unwrap_or(self.adaptive_threshold_ms),
            enable_adaptive: patch.enable_adaptive.unwrap_or(self.enable_adaptive),
            enable_preloading: patch.enable_preloading.unwrap_or(self.enable_preloading),
            debug: patch.debug.unwrap_or(self.debug),
        }
    }
}

/// Partial update for [`TransitionConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransitionConfigPatch {
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub target_delay_ms: Option<u64>,
    pub adaptive_threshold_ms: Option<u64>,
    pub enable_adaptive: Option<bool>,
    pub enable_preloading: Option<bool>,
    pub debug: Option<bool>,
}

/// Timeouts and polling intervals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimingConfig {
    /// Bound on the transition-execution step
    #[serde(default = "default_executor_timeout_ms")]
    pub executor_timeout_ms: u64,

    /// Bound on each best-effort operation (preload, probe)
    #[serde(default = "default_best_effort_cap_ms")]
    pub best_effort_cap_ms: u64,

    /// Countdown tick for the guaranteed delay
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Fixed render cost recorded with each transition
    #[serde(default = "default_render_latency_estimate_ms")]
    pub render_latency_estimate_ms: u64,
}

const fn default_executor_timeout_ms() -> u64 {
    2000
}

const fn default_best_effort_cap_ms() -> u64 {
    100
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_render_latency_estimate_ms() -> u64 {
    100
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            executor_timeout_ms: default_executor_timeout_ms(),
            best_effort_cap_ms: default_best_effort_cap_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            render_latency_estimate_ms: default_render_latency_estimate_ms(),
        }
    }
}

impl TimingConfig {
    pub const fn executor_timeout(&self) -> Duration {
        Duration::from_millis(self.executor_timeout_ms)
    }

    pub const fn best_effort_cap(&self) -> Duration {
        Duration::from_millis(self.best_effort_cap_ms)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Metrics history and reporting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportingConfig {
    /// Seconds between aggregate reports
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Number of recent records each report covers
    #[serde(default = "default_window")]
    pub window: usize,

    /// Maximum number of records kept in memory
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Success rate below which a report is flagged
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,
}

const fn default_interval_secs() -> u64 {
    30
}

const fn default_window() -> usize {
    20
}

const fn default_history_capacity() -> usize {
    50
}

const fn default_min_success_rate() -> f64 {
    0.95
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            window: default_window(),
            history_capacity: default_history_capacity(),
            min_success_rate: default_min_success_rate(),
        }
    }
}

impl ReportingConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
