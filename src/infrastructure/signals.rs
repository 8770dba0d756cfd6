//! Message-driven collaborator adapters.
//!
//! Scoring and rendering report completion asynchronously as signals on a
//! shared [`SignalBus`]. The adapters here turn those signals back into the
//! request/response shape the orchestrator's ports expect, ignoring any
//! signal that belongs to a different request.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::domain::models::{RequestId, TransitionContext};
use crate::domain::ports::{ScoringService, TransitionExecutor};

/// Number of scored responses remembered for late subscribers.
const RECENT_SCORED_CAPACITY: usize = 64;

/// Completion notifications emitted by collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSignal {
    /// Scoring finished for the response with this id.
    ScoringComplete { response_id: String },
    /// The renderer finished (or failed) the transition for this request.
    TransitionComplete {
        request_id: RequestId,
        error: Option<String>,
    },
}

/// Broadcast bus carrying [`CompletionSignal`]s.
///
/// Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<CompletionSignal>,
    recent_scored: Arc<Mutex<VecDeque<String>>>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            recent_scored: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_SCORED_CAPACITY))),
        }
    }

    fn recent_scored(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.recent_scored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a signal. Returns the number of subscribers that received it.
    pub fn publish(&self, signal: CompletionSignal) -> usize {
        if let CompletionSignal::ScoringComplete { response_id } = &signal {
            let mut recent = self.recent_scored();
            if recent.len() == RECENT_SCORED_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(response_id.clone());
        }
        self.tx.send(signal).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompletionSignal> {
        self.tx.subscribe()
    }

    /// Whether scoring for `response_id` was signalled recently.
    pub fn was_scored(&self, response_id: &str) -> bool {
        self.recent_scored().iter().any(|id| id == response_id)
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// [`ScoringService`] that waits for a `ScoringComplete` signal.
pub struct SignalScoring {
    bus: SignalBus,
}

impl SignalScoring {
    pub const fn new(bus: SignalBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ScoringService for SignalScoring {
    async fn await_scoring(&self, request_id: RequestId, context: &TransitionContext) -> Result<()> {
        // Subscribe before checking history so no signal falls between the two
        let mut signals = self.bus.subscribe();
        if self.bus.was_scored(&context.response_id) {
            return Ok(());
        }

        loop {
            match signals.recv().await {
                Ok(CompletionSignal::ScoringComplete { response_id })
                    if response_id == context.response_id =>
                {
                    debug!(%request_id, %response_id, "scoring signal received");
                    return Ok(());
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%request_id, skipped, "scoring listener lagged");
                    if self.bus.was_scored(&context.response_id) {
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Closed) => bail!("signal bus closed"),
            }
        }
    }
}

/// Instruction sent to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommand {
    pub request_id: RequestId,
    pub context: TransitionContext,
}

/// [`TransitionExecutor`] that sends a command to the renderer and waits
/// for the matching `TransitionComplete` signal.
pub struct SignalTransitionExecutor {
    commands: mpsc::Sender<TransitionCommand>,
    bus: SignalBus,
}

impl SignalTransitionExecutor {
    pub const fn new(commands: mpsc::Sender<TransitionCommand>, bus: SignalBus) -> Self {
        Self { commands, bus }
    }
}

#[async_trait]
impl TransitionExecutor for SignalTransitionExecutor {
    async fn execute(&self, request_id: RequestId, context: &TransitionContext) -> Result<()> {
        let mut signals = self.bus.subscribe();
        self.commands
            .send(TransitionCommand {
                request_id,
                context: context.clone(),
            })
            .await
            .map_err(|_| anyhow!("renderer is not accepting commands"))
            .context("failed to dispatch transition")?;

        loop {
            match signals.recv().await {
                Ok(CompletionSignal::TransitionComplete {
                    request_id: completed,
                    error,
                }) => {
                    if completed != request_id {
                        debug!(%request_id, stray = %completed, "ignoring stray transition completion");
                        continue;
                    }
                    return match error {
                        None => Ok(()),
                        Some(message) => Err(anyhow!(message)),
                    };
                }
                Ok(CompletionSignal::ScoringComplete { .. }) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%request_id, skipped, "transition listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => bail!("signal bus closed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn context(response_id: &str) -> TransitionContext {
        TransitionContext::new("s", "q").with_response(response_id, 10)
    }

    #[tokio::test]
    async fn test_scoring_waits_for_matching_response() {
        let bus = SignalBus::default();
        let scoring = SignalScoring::new(bus.clone());
        let publisher = bus.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(CompletionSignal::ScoringComplete {
                response_id: "other".to_string(),
            });
            publisher.publish(CompletionSignal::ScoringComplete {
                response_id: "r-1".to_string(),
            });
        });

        tokio::time::timeout(
            Duration::from_secs(1),
            scoring.await_scoring(RequestId::new(), &context("r-1")),
        )
        .await
        .expect("should not time out")
        .expect("scoring should succeed");
    }

    #[tokio::test]
    async fn test_scoring_already_signalled() {
        let bus = SignalBus::default();
        bus.publish(CompletionSignal::ScoringComplete {
            response_id: "r-early".to_string(),
        });

        let scoring = SignalScoring::new(bus);
        scoring
            .await_scoring(RequestId::new(), &context("r-early"))
            .await
            .expect("earlier signal should count");
    }

    #[tokio::test]
    async fn test_executor_ignores_stray_completions() {
        let bus = SignalBus::default();
        let (tx, mut rx) = mpsc::channel(4);
        let executor = SignalTransitionExecutor::new(tx, bus.clone());
        let renderer_bus = bus.clone();
        let stale = RequestId::new();

        tokio::spawn(async move {
            if let Some(command) = rx.recv().await {
                renderer_bus.publish(CompletionSignal::TransitionComplete {
                    request_id: stale,
                    error: Some("stale failure".to_string()),
                });
                renderer_bus.publish(CompletionSignal::TransitionComplete {
                    request_id: command.request_id,
                    error: None,
                });
            }
        });

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            executor.execute(RequestId::new(), &context("r")),
        )
        .await
        .expect("should not time out");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_executor_reports_renderer_failure() {
        let bus = SignalBus::default();
        let (tx, mut rx) = mpsc::channel(4);
        let executor = SignalTransitionExecutor::new(tx, bus.clone());
        let renderer_bus = bus.clone();

        tokio::spawn(async move {
            if let Some(command) = rx.recv().await {
                renderer_bus.publish(CompletionSignal::TransitionComplete {
                    request_id: command.request_id,
                    error: Some("next question missing".to_string()),
                });
            }
        });

        let err = executor
            .execute(RequestId::new(), &context("r"))
            .await
            .expect_err("renderer failure should surface");
        assert_eq!(err.to_string(), "next question missing");
    }

    #[tokio::test]
    async fn test_executor_without_renderer_fails() {
        let bus = SignalBus::default();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let executor = SignalTransitionExecutor::new(tx, bus);

        assert!(executor.execute(RequestId::new(), &context("r")).await.is_err());
    }
}
