use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{RequestId, TransitionContext};

/// Port for the subsystem that performs the user-visible transition.
///
/// Resolves when the transition for `request_id` has been carried out.
/// Returns an error when the subsystem reports an application-level failure.
#[async_trait]
pub trait TransitionExecutor: Send + Sync {
    async fn execute(&self, request_id: RequestId, context: &TransitionContext) -> Result<()>;
}
