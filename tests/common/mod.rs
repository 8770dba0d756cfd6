//! Common test utilities for integration tests
//!
//! Hand-written port mocks and orchestrator fixtures shared across test files.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pacer::domain::models::{
    Complexity, Config, NetworkCondition, RequestId, TransitionContext, TransitionPhase,
    TransitionState,
};
use pacer::domain::ports::{ScoringService, TransitionExecutor};
use pacer::services::TransitionOrchestrator;
use tokio::sync::broadcast;

// ========================
// Mock Implementations
// ========================

/// Scoring that finishes after a fixed latency, or fails immediately.
pub struct MockScoring {
    latency: Duration,
    fail: bool,
    calls: AtomicUsize,
}

impl MockScoring {
    pub fn new(latency_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            latency: Duration::from_millis(latency_ms),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            latency: Duration::ZERO,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringService for MockScoring {
    async fn await_scoring(&self, _request_id: RequestId, _context: &TransitionContext) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("scoring backend unavailable");
        }
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// Executor that records every request it was asked to perform.
pub struct MockExecutor {
    latency: Duration,
    fail: bool,
    executed: Mutex<Vec<RequestId>>,
}

impl MockExecutor {
    pub fn new(latency_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            latency: Duration::from_millis(latency_ms),
            fail: false,
            executed: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            latency: Duration::ZERO,
            fail: true,
            executed: Mutex::new(Vec::new()),
        })
    }

    pub fn executed(&self) -> Vec<RequestId> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransitionExecutor for MockExecutor {
    async fn execute(&self, request_id: RequestId, _context: &TransitionContext) -> Result<()> {
        self.executed.lock().unwrap().push(request_id);
        tokio::time::sleep(self.latency).await;
        if self.fail {
            bail!("next question could not be rendered");
        }
        Ok(())
    }
}

// ========================
// Fixtures
// ========================

pub fn orchestrator(
    scoring: Arc<MockScoring>,
    executor: Arc<MockExecutor>,
) -> Arc<TransitionOrchestrator> {
    Arc::new(
        TransitionOrchestrator::new(&Config::default(), scoring, executor)
            .expect("default config is valid"),
    )
}

/// Low complexity on a fast network plans exactly 2300ms with default config.
pub fn low_fast_context(question_id: &str) -> TransitionContext {
    TransitionContext::new("session-1", question_id)
        .with_response(format!("response-{question_id}"), 120)
        .with_complexity(Complexity::Low)
        .with_network(NetworkCondition::Fast)
}

/// Drain buffered events without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<TransitionState>) -> Vec<TransitionState> {
    let mut events = Vec::new();
    while let Ok(state) = rx.try_recv() {
        events.push(state);
    }
    events
}

/// Phases in the order they were published, with consecutive repeats collapsed.
pub fn phase_sequence(events: &[TransitionState]) -> Vec<TransitionPhase> {
    let mut phases: Vec<TransitionPhase> = Vec::new();
    for state in events {
        if phases.last() != Some(&state.phase) {
            phases.push(state.phase);
        }
    }
    phases
}
