//! Bounded invocation of the transition-execution port.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::errors::{DomainResult, TransitionError};
use crate::domain::models::{RequestId, TransitionContext};
use crate::domain::ports::TransitionExecutor;

/// Wraps a [`TransitionExecutor`] with a fixed timeout and error mapping.
///
/// The adapter itself has no notion of which request is current; the
/// orchestrator compares the settled request id against its own before
/// acting on the result.
#[derive(Clone)]
pub struct TransitionExecutorAdapter {
    executor: Arc<dyn TransitionExecutor>,
    timeout: Duration,
}

impl TransitionExecutorAdapter {
    pub fn new(executor: Arc<dyn TransitionExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the transition for `request_id`, failing after the adapter timeout.
    pub async fn execute(&self, request_id: RequestId, context: &TransitionContext) -> DomainResult<()> {
        debug!(%request_id, timeout_ms = self.timeout.as_millis() as u64, "executing transition");

        match timeout(self.timeout, self.executor.execute(request_id, context)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(TransitionError::TransitionExecutionError {
                request_id,
                message: format!("{err:#}"),
            }),
            Err(_) => Err(TransitionError::TransitionExecutionTimeout {
                request_id,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    struct SleepyExecutor {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl TransitionExecutor for SleepyExecutor {
        async fn execute(&self, _: RequestId, _: &TransitionContext) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                bail!("renderer rejected transition");
            }
            Ok(())
        }
    }

    fn adapter(delay_ms: u64, fail: bool) -> TransitionExecutorAdapter {
        TransitionExecutorAdapter::new(
            Arc::new(SleepyExecutor {
                delay: Duration::from_millis(delay_ms),
                fail,
            }),
            Duration::from_millis(2000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_within_timeout() {
        let result = adapter(150, false)
            .execute(RequestId::new(), &TransitionContext::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_execution_timeout() {
        let id = RequestId::new();
        let err = adapter(5000, false)
            .execute(id, &TransitionContext::default())
            .await
            .expect_err("should time out");
        assert_eq!(
            err,
            TransitionError::TransitionExecutionTimeout {
                request_id: id,
                timeout_ms: 2000
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_port_failure_maps_to_execution_error() {
        let err = adapter(10, true)
            .execute(RequestId::new(), &TransitionContext::default())
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            TransitionError::TransitionExecutionError { ref message, .. } if message == "renderer rejected transition"
        ));
    }
}
