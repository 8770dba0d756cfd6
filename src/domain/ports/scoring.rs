use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{RequestId, TransitionContext};

/// Port for the scoring subsystem.
///
/// Scoring is the only upstream operation on the critical path: the
/// orchestrator cannot leave the waiting phase until it settles.
///
/// # Examples
///
/// ```no_run
/// use pacer::domain::models::{RequestId, TransitionContext};
/// use pacer::domain::ports::ScoringService;
/// use anyhow::Result;
///
/// async fn example(scoring: &dyn ScoringService, ctx: &TransitionContext) -> Result<()> {
///     scoring.await_scoring(RequestId::new(), ctx).await
/// }
/// ```
#[async_trait]
pub trait ScoringService: Send + Sync {
    /// Resolve once scoring for `request_id` has completed.
    ///
    /// Implementations may wait indefinitely; the caller applies the ceiling.
    async fn await_scoring(&self, request_id: RequestId, context: &TransitionContext) -> Result<()>;
}
