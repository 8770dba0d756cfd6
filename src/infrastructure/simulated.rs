//! In-process collaborators with configurable latency.
//!
//! Used by the `simulate` command and by tests to exercise the orchestrator
//! without a real scoring backend or renderer.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::signals::{CompletionSignal, SignalBus, TransitionCommand};
use crate::domain::models::{RequestId, TransitionContext};
use crate::domain::ports::{ContentPreloader, NetworkProbe, ScoringService, TransitionExecutor};

/// Scoring that completes after a fixed latency.
#[derive(Debug)]
pub struct SimulatedScoring {
    latency_ms: AtomicU64,
    fail: bool,
}

impl SimulatedScoring {
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency_ms: AtomicU64::new(latency.as_millis() as u64),
            fail: false,
        }
    }

    pub const fn failing() -> Self {
        Self {
            latency_ms: AtomicU64::new(0),
            fail: true,
        }
    }

    /// Change the latency used by later calls.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for SimulatedScoring {
    fn default() -> Self {
        Self::new(Duration::from_millis(800))
    }
}

#[async_trait]
impl ScoringService for SimulatedScoring {
    async fn await_scoring(&self, request_id: RequestId, _context: &TransitionContext) -> Result<()> {
        if self.fail {
            bail!("simulated scoring failure");
        }
        let latency = Duration::from_millis(self.latency_ms.load(Ordering::SeqCst));
        tokio::time::sleep(latency).await;
        debug!(%request_id, latency_ms = latency.as_millis() as u64, "simulated scoring complete");
        Ok(())
    }
}

/// Preloader that sleeps and counts its invocations.
#[derive(Debug, Default)]
pub struct SimulatedPreloader {
    latency: Duration,
    calls: AtomicUsize,
}

impl SimulatedPreloader {
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentPreloader for SimulatedPreloader {
    async fn preload(&self, _request_id: RequestId, _context: &TransitionContext) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// Probe reporting a fixed round-trip, or failing when none is set.
#[derive(Debug, Default)]
pub struct SimulatedProbe {
    latency: Option<Duration>,
}

impl SimulatedProbe {
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
        }
    }

    pub const fn unreachable() -> Self {
        Self { latency: None }
    }
}

#[async_trait]
impl NetworkProbe for SimulatedProbe {
    async fn probe(&self) -> Result<Duration> {
        let Some(latency) = self.latency else {
            bail!("simulated probe endpoint unreachable");
        };
        tokio::time::sleep(latency).await;
        Ok(latency)
    }
}

/// Executor that performs the transition directly after a fixed latency.
#[derive(Debug)]
pub struct SimulatedExecutor {
    latency: Duration,
    executed: AtomicUsize,
}

impl SimulatedExecutor {
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency,
            executed: AtomicUsize::new(0),
        }
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl TransitionExecutor for SimulatedExecutor {
    async fn execute(&self, _request_id: RequestId, _context: &TransitionContext) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Signal scoring completion for `response_id` after `latency`.
pub fn spawn_scoring_completion(
    bus: &SignalBus,
    response_id: impl Into<String>,
    latency: Duration,
) -> JoinHandle<()> {
    let bus = bus.clone();
    let response_id = response_id.into();
    tokio::spawn(async move {
        tokio::time::sleep(latency).await;
        bus.publish(CompletionSignal::ScoringComplete { response_id });
    })
}

/// Consume transition commands and signal completion after `render_latency`.
///
/// Runs until every command sender is dropped.
pub fn spawn_simulated_renderer(
    mut commands: mpsc::Receiver<TransitionCommand>,
    bus: SignalBus,
    render_latency: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            tokio::time::sleep(render_latency).await;
            debug!(request_id = %command.request_id, "simulated render complete");
            bus.publish(CompletionSignal::TransitionComplete {
                request_id: command.request_id,
                error: None,
            });
        }
    })
}
