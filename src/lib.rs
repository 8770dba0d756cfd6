//! Pacer - adaptive transition timing
//!
//! Pacer decides how long to wait between a submitted response and the next
//! automated action in a session, so the pause feels deliberate without
//! dragging. Each transition gets a target delay planned from the response's
//! complexity, the network condition, the payload size and recent history,
//! and that delay is enforced as a floor even when upstream work finishes
//! early.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and collaborator ports
//! - **Service Layer** (`services`): delay planning, waiting, execution and metrics
//! - **Infrastructure Layer** (`infrastructure`): config, logging and collaborator adapters
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pacer::{Config, TransitionContext, TransitionOrchestrator};
//! use pacer::infrastructure::simulated::{SimulatedExecutor, SimulatedScoring};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = TransitionOrchestrator::new(
//!         &Config::default(),
//!         Arc::new(SimulatedScoring::default()),
//!         Arc::new(SimulatedExecutor::default()),
//!     )?;
//!     let metrics = orchestrator
//!         .start_transition(TransitionContext::new("session", "question"))
//!         .await?;
//!     println!("waited {}ms", metrics.actual_delay_ms);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Complexity, Config, NetworkCondition, PerformanceReport, PerformanceStats, Priority,
    RequestId, TransitionConfig, TransitionConfigPatch, TransitionContext, TransitionMetrics,
    TransitionPhase, TransitionState,
};
pub use domain::ports::{ContentPreloader, NetworkProbe, ScoringService, TransitionExecutor};
pub use domain::{ConfigError, DomainResult, TransitionError};
pub use infrastructure::config::ConfigLoader;
pub use services::{compute_target, DelayPlan, TransitionOrchestrator};
