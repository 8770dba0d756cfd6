//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that collaborator adapters must implement:
//! - ScoringService: signals when scoring for a request has finished
//! - ContentPreloader: primes resources for the next action (best-effort)
//! - NetworkProbe: samples one network round-trip (best-effort)
//! - TransitionExecutor: performs the user-visible transition
//!
//! These traits keep the orchestrator independent of the transport the
//! collaborators are reached over.

pub mod content_preloader;
pub mod network_probe;
pub mod scoring;
pub mod transition_executor;

pub use content_preloader::{ContentPreloader, NullPreloader};
pub use network_probe::NetworkProbe;
pub use scoring::ScoringService;
pub use transition_executor::TransitionExecutor;
