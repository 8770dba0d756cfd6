use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{RequestId, TransitionContext};

/// Port for the content-preparation subsystem.
///
/// Preloading is best-effort. Failures are logged by the caller and never
/// affect the transition.
#[async_trait]
pub trait ContentPreloader: Send + Sync {
    async fn preload(&self, request_id: RequestId, context: &TransitionContext) -> Result<()>;
}

/// Preloader that does nothing, for deployments without content preparation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPreloader;

#[async_trait]
impl ContentPreloader for NullPreloader {
    async fn preload(&self, _request_id: RequestId, _context: &TransitionContext) -> Result<()> {
        Ok(())
    }
}
