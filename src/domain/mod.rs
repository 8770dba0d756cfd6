//! Domain layer for the transition orchestrator
//!
//! This module contains the core models, errors and the port traits that
//! external collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{ConfigError, DomainResult, TransitionError};
