//! Infrastructure layer: configuration, logging, and collaborator adapters.

pub mod config;
pub mod logging;
pub mod signals;
pub mod simulated;

pub use config::{ConfigError, ConfigLoader};
pub use logging::{LogConfig, LoggerImpl};
pub use signals::{CompletionSignal, SignalBus, SignalScoring, SignalTransitionExecutor, TransitionCommand};
