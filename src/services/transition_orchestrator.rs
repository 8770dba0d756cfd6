//! Transition orchestrator.
//!
//! Drives one transition at a time through
//! `idle -> analyzing -> waiting -> transitioning -> complete -> idle`,
//! falling back to `idle` on any failure. Every state write happens while
//! holding the active-transition lock, so a cancelled or superseded request
//! can never publish over the state of the request that replaced it.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{ConfigError, DomainResult, TransitionError};
use crate::domain::models::{
    Config, NetworkCondition, PerformanceReport, PerformanceStats, RequestId, TimingConfig,
    TransitionConfig, TransitionConfigPatch, TransitionContext, TransitionMetrics,
    TransitionPhase, TransitionState,
};
use crate::domain::ports::{ContentPreloader, NetworkProbe, ScoringService, TransitionExecutor};
use crate::services::delay_planner::{self, DelayPlan};
use crate::services::executor_adapter::TransitionExecutorAdapter;
use crate::services::guaranteed_delay::{DelayOutcome, GuaranteedDelay};
use crate::services::latency_sampler::LatencySampler;
use crate::services::metrics_recorder::MetricsRecorder;
use crate::services::upstream_waiter::UpstreamWaiter;

/// Progress published when the waiting phase begins.
const PROGRESS_WAITING: f64 = 10.0;
/// Progress published when the transition action is invoked.
const PROGRESS_TRANSITIONING: f64 = 90.0;
const PROGRESS_COMPLETE: f64 = 100.0;

/// Buffered phase events per subscriber.
const EVENT_CAPACITY: usize = 64;

/// The transition that currently owns the state slot.
struct ActiveTransition {
    request_id: RequestId,
    cancel: CancellationToken,
}

/// Releases the slot if the owning call is dropped before it settles.
///
/// Fires the request's cancel token and resets to idle without recording
/// metrics. A no-op once the request is no longer current.
struct SlotGuard<'a> {
    orchestrator: &'a TransitionOrchestrator,
    request_id: RequestId,
    armed: bool,
}

impl<'a> SlotGuard<'a> {
    const fn new(orchestrator: &'a TransitionOrchestrator, request_id: RequestId) -> Self {
        Self {
            orchestrator,
            request_id,
            armed: true,
        }
    }

    /// Hand the slot back to the caller, which settles it itself.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut active = self.orchestrator.lock_active();
        match active.as_ref() {
            Some(current) if current.request_id == self.request_id => current.cancel.cancel(),
            _ => return,
        }
        self.orchestrator.reset_locked(&mut active);
        debug!(request_id = %self.request_id, "transition dropped before settling, slot released");
    }
}

/// Timing facts gathered while a transition runs, used for its metrics.
#[derive(Debug, Default)]
struct Timeline {
    scoring_latency: Option<Duration>,
    actual_delay: Option<Duration>,
}

/// Per-session orchestrator for adaptive transition timing.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use pacer::domain::models::{Config, TransitionContext};
/// use pacer::infrastructure::simulated::{SimulatedScoring, SimulatedExecutor};
/// use pacer::services::TransitionOrchestrator;
///
/// # async fn example() -> anyhow::Result<()> {
/// let orchestrator = TransitionOrchestrator::new(
///     &Config::default(),
///     Arc::new(SimulatedScoring::default()),
///     Arc::new(SimulatedExecutor::default()),
/// )?;
///
/// let metrics = orchestrator
///     .start_transition(TransitionContext::new("session-1", "question-1"))
///     .await?;
/// println!("transition took {}ms", metrics.total_latency_ms);
/// # Ok(())
/// # }
/// ```
pub struct TransitionOrchestrator {
    waiter: UpstreamWaiter,
    adapter: TransitionExecutorAdapter,
    delay: GuaranteedDelay,
    recorder: Arc<MetricsRecorder>,
    sampler: Arc<LatencySampler>,
    timing: TimingConfig,
    config: watch::Sender<TransitionConfig>,
    state: watch::Sender<TransitionState>,
    events: broadcast::Sender<TransitionState>,
    active: Mutex<Option<ActiveTransition>>,
    shutdown: CancellationToken,
}

impl TransitionOrchestrator {
    /// Create an orchestrator with the required collaborators.
    ///
    /// Preloading and network probing are disabled until
    /// [`with_preloader`](Self::with_preloader) and
    /// [`with_probe`](Self::with_probe) are called.
    pub fn new(
        config: &Config,
        scoring: Arc<dyn ScoringService>,
        executor: Arc<dyn TransitionExecutor>,
    ) -> Result<Self, ConfigError> {
        config.transition.validate()?;

        let sampler = Arc::new(LatencySampler::default());
        let waiter = UpstreamWaiter::new(
            scoring,
            Arc::clone(&sampler),
            config.timing.best_effort_cap(),
        );
        let (config_tx, _) = watch::channel(config.transition.clone());
        let (state_tx, _) = watch::channel(TransitionState::idle());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            waiter,
            adapter: TransitionExecutorAdapter::new(executor, config.timing.executor_timeout()),
            delay: GuaranteedDelay::new(config.timing.poll_interval()),
            recorder: Arc::new(MetricsRecorder::new(config.reporting.clone())),
            sampler,
            timing: config.timing.clone(),
            config: config_tx,
            state: state_tx,
            events: events_tx,
            active: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    /// Set the content-preparation collaborator.
    pub fn with_preloader(mut self, preloader: Arc<dyn ContentPreloader>) -> Self {
        self.waiter = self.waiter.with_preloader(preloader);
        self
    }

    /// Set the network-probe collaborator.
    pub fn with_probe(mut self, probe: Arc<dyn NetworkProbe>) -> Self {
        self.waiter = self.waiter.with_probe(probe);
        self
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Merge `patch` into the current config.
    ///
    /// An invalid result is rejected and the previous config stays in effect.
    /// Transitions already running keep the config they started with.
    pub fn configure(&self, patch: &TransitionConfigPatch) -> Result<TransitionConfig, ConfigError> {
        let merged = self.config.borrow().merged(patch);
        merged.validate()?;
        self.config.send_replace(merged.clone());
        info!(
            min_delay_ms = merged.min_delay_ms,
            target_delay_ms = merged.target_delay_ms,
            max_delay_ms = merged.max_delay_ms,
            enable_adaptive = merged.enable_adaptive,
            "transition config updated"
        );
        Ok(merged)
    }

    /// Snapshot of the current transition config.
    pub fn config(&self) -> TransitionConfig {
        self.config.borrow().clone()
    }

    /// Timeouts and intervals fixed at construction.
    pub const fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    // ========================================================================
    // Transition lifecycle
    // ========================================================================

    /// Run a full transition: plan, wait upstream, fill the delay floor,
    /// execute, record.
    ///
    /// Returns `Busy` without touching state if another transition is
    /// active, and `Cancelled` if [`cancel_transition`](Self::cancel_transition)
    /// or a forced transition ends this one early. Fatal errors are returned
    /// after the failure has been recorded and state is back to idle.
    #[instrument(skip(self, context), fields(session_id = %context.session_id, question_id = %context.question_id))]
    pub async fn start_transition(&self, context: TransitionContext) -> DomainResult<TransitionMetrics> {
        let config = self.config();
        let (request_id, cancel) = self.claim(&context, TransitionPhase::Analyzing, 0.0)?;
        let slot = SlotGuard::new(self, request_id);
        let started_at = Utc::now();
        let started = Instant::now();

        let history = self.recorder.history();
        let plan = delay_planner::plan(&context, &config, &history);
        self.trace_plan(&config, request_id, &plan);

        let target = plan.target();
        self.publish(request_id, |state| {
            state.phase = TransitionPhase::Waiting;
            state.remaining_delay_ms = plan.target_ms;
            state.progress = PROGRESS_WAITING;
            state.estimated_completion = Some(started_at + chrono_duration(target));
        });

        let mut timeline = Timeline::default();
        let result = self
            .run_pipeline(request_id, &context, &config, target, started, &cancel, &mut timeline)
            .await;

        slot.disarm();
        self.settle(request_id, &config, plan.target_ms, started_at, started, &timeline, result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_pipeline(
        &self,
        request_id: RequestId,
        context: &TransitionContext,
        config: &TransitionConfig,
        target: Duration,
        started: Instant,
        cancel: &CancellationToken,
        timeline: &mut Timeline,
    ) -> DomainResult<()> {
        let upstream = self.waiter.wait(request_id, context, config, cancel).await?;
        timeline.scoring_latency = Some(upstream.scoring_latency);

        let remaining = target.saturating_sub(upstream.scoring_latency);
        self.trace_phase(config, request_id, TransitionPhase::Waiting, remaining);

        let outcome = self
            .delay
            .run(remaining, cancel, |left, percent| {
                self.publish(request_id, |state| {
                    state.remaining_delay_ms = left.as_millis() as u64;
                    state.progress = PROGRESS_WAITING
                        + (PROGRESS_TRANSITIONING - PROGRESS_WAITING) * percent / 100.0;
                });
            })
            .await;
        if outcome == DelayOutcome::Cancelled {
            return Err(TransitionError::Cancelled { request_id });
        }

        timeline.actual_delay = Some(started.elapsed());
        self.publish(request_id, |state| {
            state.phase = TransitionPhase::Transitioning;
            state.remaining_delay_ms = 0;
            state.progress = PROGRESS_TRANSITIONING;
        });
        self.trace_phase(config, request_id, TransitionPhase::Transitioning, Duration::ZERO);

        self.adapter.execute(request_id, context).await
    }

    /// Record the outcome and return the slot to idle, unless the request
    /// stopped being current while it was in flight.
    #[allow(clippy::too_many_arguments)]
    fn settle(
        &self,
        request_id: RequestId,
        config: &TransitionConfig,
        target_ms: u64,
        started_at: DateTime<Utc>,
        started: Instant,
        timeline: &Timeline,
        result: DomainResult<()>,
    ) -> DomainResult<TransitionMetrics> {
        let mut active = self.lock_active();
        if !is_current(&active, request_id) {
            debug!(%request_id, "discarding settlement for a transition that is no longer current");
            return Err(TransitionError::Cancelled { request_id });
        }
        if let Err(err) = &result {
            if err.is_cancelled() {
                // Cancellation already reset the slot
                return Err(TransitionError::Cancelled { request_id });
            }
        }

        let error = result.as_ref().err().map(ToString::to_string);
        let total_latency = started.elapsed();
        let metrics = TransitionMetrics {
            request_id,
            started_at,
            ended_at: Utc::now(),
            actual_delay_ms: timeline.actual_delay.unwrap_or(total_latency).as_millis() as u64,
            target_delay_ms: target_ms,
            scoring_latency_ms: timeline
                .scoring_latency
                .map_or(0, |latency| latency.as_millis() as u64),
            network_latency_ms: self
                .sampler
                .average()
                .map_or(0, |latency| latency.as_millis() as u64),
            render_latency_ms: self.timing.render_latency_estimate_ms,
            total_latency_ms: total_latency.as_millis() as u64,
            success: result.is_ok(),
            error,
        };
        self.recorder.record(metrics.clone());

        match result {
            Ok(()) => {
                self.write_state(|state| {
                    state.phase = TransitionPhase::Complete;
                    state.remaining_delay_ms = 0;
                    state.progress = PROGRESS_COMPLETE;
                });
                self.reset_locked(&mut active);
                if config.debug {
                    info!(%request_id, total_latency_ms = metrics.total_latency_ms, deviation_ms = metrics.deviation_ms(), "transition complete");
                } else {
                    debug!(%request_id, total_latency_ms = metrics.total_latency_ms, deviation_ms = metrics.deviation_ms(), "transition complete");
                }
                Ok(metrics)
            }
            Err(err) => {
                self.reset_locked(&mut active);
                warn!(%request_id, error = %err, "transition failed");
                Err(err)
            }
        }
    }

    /// Abandon the active transition, if any.
    ///
    /// Does not record metrics. In-flight collaborator calls are not aborted;
    /// their eventual results are discarded. Returns whether a transition
    /// was active.
    pub fn cancel_transition(&self) -> bool {
        let mut active = self.lock_active();
        let Some(current) = active.as_ref() else {
            return false;
        };
        let request_id = current.request_id;
        current.cancel.cancel();
        self.reset_locked(&mut active);
        info!(%request_id, "transition cancelled");
        true
    }

    /// Cancel any active transition and execute immediately, with no
    /// planning and no delay floor. No metrics are recorded.
    #[instrument(skip(self, context), fields(session_id = %context.session_id, question_id = %context.question_id))]
    pub async fn force_immediate_transition(&self, context: TransitionContext) -> DomainResult<()> {
        self.cancel_transition();
        let (request_id, _cancel) =
            self.claim(&context, TransitionPhase::Transitioning, PROGRESS_TRANSITIONING)?;
        let slot = SlotGuard::new(self, request_id);
        info!(%request_id, "forcing immediate transition");

        let result = self.adapter.execute(request_id, &context).await;
        slot.disarm();

        let mut active = self.lock_active();
        if !is_current(&active, request_id) {
            return Err(TransitionError::Cancelled { request_id });
        }
        if result.is_ok() {
            self.write_state(|state| {
                state.phase = TransitionPhase::Complete;
                state.progress = PROGRESS_COMPLETE;
            });
        } else if let Err(err) = &result {
            warn!(%request_id, error = %err, "forced transition failed");
        }
        self.reset_locked(&mut active);
        result
    }

    /// Cancel any active transition and stop the background reporter.
    pub fn shutdown(&self) {
        self.cancel_transition();
        self.shutdown.cancel();
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribe to the current state.
    pub fn transition_state(&self) -> watch::Receiver<TransitionState> {
        self.state.subscribe()
    }

    /// Subscribe to every published state, in order.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TransitionState> {
        self.events.subscribe()
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> TransitionState {
        self.state.borrow().clone()
    }

    /// Whether a transition owns the slot.
    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Id of the transition that owns the slot, if any.
    pub fn current_request_id(&self) -> Option<RequestId> {
        self.lock_active().as_ref().map(|active| active.request_id)
    }

    /// Subscribe to the metrics history.
    pub fn metrics(&self) -> watch::Receiver<Vec<TransitionMetrics>> {
        self.recorder.subscribe()
    }

    /// Copy of the recorded metrics, oldest first.
    pub fn metrics_history(&self) -> Vec<TransitionMetrics> {
        self.recorder.history()
    }

    /// Aggregate stats over the reporting window.
    pub fn performance_stats(&self) -> PerformanceStats {
        self.recorder.stats(self.config.borrow().adaptive_threshold_ms)
    }

    /// Clear the metrics history.
    pub fn reset_metrics(&self) {
        self.recorder.reset();
        info!("transition metrics reset");
    }

    /// Start the periodic performance reporter.
    pub fn start_reporting(&self) -> JoinHandle<()> {
        self.recorder
            .spawn_reporter(self.config.subscribe(), self.shutdown.child_token())
    }

    /// Subscribe to periodic performance reports.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<PerformanceReport> {
        self.recorder.subscribe_reports()
    }

    /// Rolling average of recent network probes.
    pub fn network_latency(&self) -> Option<Duration> {
        self.sampler.average()
    }

    /// Network class suggested by recent probes.
    pub fn suggested_network_condition(&self) -> Option<NetworkCondition> {
        self.sampler.suggested_condition()
    }

    // ========================================================================
    // State slot
    // ========================================================================

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveTransition>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of the slot for a new request and publish its first phase.
    fn claim(
        &self,
        context: &TransitionContext,
        phase: TransitionPhase,
        progress: f64,
    ) -> DomainResult<(RequestId, CancellationToken)> {
        let mut active = self.lock_active();
        if let Some(current) = active.as_ref() {
            return Err(TransitionError::Busy {
                current: current.request_id,
            });
        }

        let request_id = RequestId::new();
        let cancel = CancellationToken::new();
        *active = Some(ActiveTransition {
            request_id,
            cancel: cancel.clone(),
        });
        self.write_state(|state| {
            *state = TransitionState {
                phase,
                remaining_delay_ms: 0,
                progress,
                estimated_completion: None,
                request_id: Some(request_id),
                context: Some(context.clone()),
            };
        });
        Ok((request_id, cancel))
    }

    /// Apply `update` only if `request_id` still owns the slot.
    fn publish<F>(&self, request_id: RequestId, update: F)
    where
        F: FnOnce(&mut TransitionState),
    {
        let active = self.lock_active();
        if is_current(&active, request_id) {
            self.write_state(update);
        }
    }

    /// Write state and fan it out. Callers must hold the active lock.
    fn write_state<F>(&self, update: F)
    where
        F: FnOnce(&mut TransitionState),
    {
        self.state.send_modify(|state| {
            let previous = state.progress;
            update(state);
            if state.phase != TransitionPhase::Analyzing {
                state.progress = state.progress.clamp(previous, PROGRESS_COMPLETE);
            }
        });
        // No subscribers is fine
        let _ = self.events.send(self.state.borrow().clone());
    }

    fn reset_locked(&self, active: &mut MutexGuard<'_, Option<ActiveTransition>>) {
        **active = None;
        self.state.send_replace(TransitionState::idle());
        let _ = self.events.send(TransitionState::idle());
    }

    fn trace_plan(&self, config: &TransitionConfig, request_id: RequestId, plan: &DelayPlan) {
        if config.debug {
            info!(
                %request_id,
                base_ms = plan.base_ms,
                complexity_ms = plan.complexity_adjustment_ms,
                network_ms = plan.network_adjustment_ms,
                payload_ms = plan.payload_adjustment_ms,
                adaptive_ms = plan.adaptive_adjustment_ms,
                target_ms = plan.target_ms,
                clamped = plan.was_clamped(),
                "delay planned"
            );
        } else {
            debug!(%request_id, target_ms = plan.target_ms, clamped = plan.was_clamped(), "delay planned");
        }
    }

    fn trace_phase(
        &self,
        config: &TransitionConfig,
        request_id: RequestId,
        phase: TransitionPhase,
        remaining: Duration,
    ) {
        let remaining_ms = remaining.as_millis() as u64;
        if config.debug {
            info!(%request_id, %phase, remaining_ms, "transition phase");
        } else {
            debug!(%request_id, %phase, remaining_ms, "transition phase");
        }
    }
}

fn is_current(active: &Option<ActiveTransition>, request_id: RequestId) -> bool {
    active
        .as_ref()
        .is_some_and(|current| current.request_id == request_id)
}

fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}
