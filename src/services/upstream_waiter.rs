//! Concurrent upstream wait.
//!
//! Scoring is awaited inline under the transition ceiling. Preloading and the
//! network probe run as detached tasks with a short cap of their own; their
//! outcomes never reach the caller.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::{DomainResult, TransitionError};
use crate::domain::models::{RequestId, TransitionConfig, TransitionContext};
use crate::domain::ports::{ContentPreloader, NetworkProbe, NullPreloader, ScoringService};
use crate::services::latency_sampler::LatencySampler;

/// Result of a settled upstream wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamReport {
    /// Wall-clock time until scoring settled.
    pub scoring_latency: Duration,
}

/// Runs scoring, preload and probe concurrently for one transition.
pub struct UpstreamWaiter {
    scoring: Arc<dyn ScoringService>,
    preloader: Arc<dyn ContentPreloader>,
    probe: Option<Arc<dyn NetworkProbe>>,
    sampler: Arc<LatencySampler>,
    best_effort_cap: Duration,
}

impl UpstreamWaiter {
    /// Waiter with no content preparation and no network probing.
    pub fn new(
        scoring: Arc<dyn ScoringService>,
        sampler: Arc<LatencySampler>,
        best_effort_cap: Duration,
    ) -> Self {
        Self {
            scoring,
            preloader: Arc::new(NullPreloader),
            probe: None,
            sampler,
            best_effort_cap,
        }
    }

    pub fn with_preloader(mut self, preloader: Arc<dyn ContentPreloader>) -> Self {
        self.preloader = preloader;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn NetworkProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Wait for scoring to settle, launching the best-effort work alongside.
    ///
    /// Fails with `ScoringTimeout` once `config.max_delay_ms` elapses, with
    /// `ScoringFailed` if the scoring port reports an error, and with
    /// `Cancelled` as soon as `cancel` fires.
    pub async fn wait(
        &self,
        request_id: RequestId,
        context: &TransitionContext,
        config: &TransitionConfig,
        cancel: &CancellationToken,
    ) -> DomainResult<UpstreamReport> {
        let started = Instant::now();

        if config.enable_preloading {
            self.spawn_preload(request_id, context.clone());
        }
        self.spawn_probe(request_id);

        let ceiling = config.max_delay();
        let scoring = timeout(ceiling, self.scoring.await_scoring(request_id, context));

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransitionError::Cancelled { request_id }),
            outcome = scoring => outcome,
        };

        match outcome {
            Ok(Ok(())) => {
                let scoring_latency = started.elapsed();
                debug!(
                    %request_id,
                    scoring_latency_ms = scoring_latency.as_millis() as u64,
                    "scoring settled"
                );
                Ok(UpstreamReport { scoring_latency })
            }
            Ok(Err(err)) => Err(TransitionError::ScoringFailed {
                request_id,
                message: format!("{err:#}"),
            }),
            Err(_) => Err(TransitionError::ScoringTimeout {
                request_id,
                timeout_ms: config.max_delay_ms,
            }),
        }
    }

    fn spawn_preload(&self, request_id: RequestId, context: TransitionContext) {
        let preloader = Arc::clone(&self.preloader);
        let cap = self.best_effort_cap;
        tokio::spawn(async move {
            match timeout(cap, preloader.preload(request_id, &context)).await {
                Ok(Ok(())) => debug!(%request_id, "preload finished"),
                Ok(Err(err)) => warn!(%request_id, error = %err, "preload failed, continuing"),
                Err(_) => debug!(%request_id, cap_ms = cap.as_millis() as u64, "preload still running past cap, continuing"),
            }
        });
    }

    fn spawn_probe(&self, request_id: RequestId) {
        let Some(probe) = self.probe.as_ref().map(Arc::clone) else {
            return;
        };
        let sampler = Arc::clone(&self.sampler);
        let cap = self.best_effort_cap;
        tokio::spawn(async move {
            match timeout(cap, probe.probe()).await {
                Ok(Ok(latency)) => {
                    sampler.record(latency);
                    debug!(%request_id, latency_ms = latency.as_millis() as u64, "network probe sampled");
                }
                Ok(Err(err)) => warn!(%request_id, error = %err, "network probe failed, ignoring"),
                Err(_) => debug!(%request_id, "network probe exceeded cap, ignoring"),
            }
        });
    }
}
