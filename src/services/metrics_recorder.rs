//! Transition outcome history and periodic performance reporting.
//!
//! The history is held in a `watch` channel so readers can either take a
//! snapshot or subscribe to every change. A background reporter summarises
//! the most recent window at a fixed interval and broadcasts the result.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::models::{
    PerformanceReport, PerformanceStats, ReportingConfig, TransitionConfig, TransitionMetrics,
};

/// Aggregate the most recent `window` records.
pub fn compute_stats(
    history: &[TransitionMetrics],
    window: usize,
    adaptive_threshold_ms: u64,
    min_success_rate: f64,
) -> PerformanceStats {
    let recent = &history[history.len().saturating_sub(window)..];
    if recent.is_empty() {
        return PerformanceStats::empty();
    }

    let count = recent.len() as f64;
    let successes = recent.iter().filter(|m| m.success).count() as f64;
    let total_delay: u64 = recent.iter().map(|m| m.actual_delay_ms).sum();
    let total_deviation: u64 = recent.iter().map(|m| m.deviation_ms().unsigned_abs()).sum();

    let success_rate = successes / count;
    let average_deviation_ms = total_deviation as f64 / count;

    PerformanceStats {
        success_rate,
        average_delay_ms: total_delay as f64 / count,
        average_deviation_ms,
        sample_size: recent.len(),
        is_within_target: success_rate >= min_success_rate
            && average_deviation_ms <= adaptive_threshold_ms as f64,
    }
}

/// Bounded, append-only store of transition outcomes.
pub struct MetricsRecorder {
    history: watch::Sender<Vec<TransitionMetrics>>,
    reports: broadcast::Sender<PerformanceReport>,
    config: ReportingConfig,
}

impl MetricsRecorder {
    pub fn new(config: ReportingConfig) -> Self {
        let (history, _) = watch::channel(Vec::with_capacity(config.history_capacity));
        let (reports, _) = broadcast::channel(16);
        Self {
            history,
            reports,
            config,
        }
    }

    pub const fn config(&self) -> &ReportingConfig {
        &self.config
    }

    /// Append a record, evicting the oldest beyond capacity.
    pub fn record(&self, metrics: TransitionMetrics) {
        let capacity = self.config.history_capacity.max(1);
        self.history.send_modify(|history| {
            history.push(metrics);
            if history.len() > capacity {
                let excess = history.len() - capacity;
                history.drain(..excess);
            }
        });
    }

    /// Snapshot of the full history, oldest first.
    pub fn history(&self) -> Vec<TransitionMetrics> {
        self.history.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.borrow().is_empty()
    }

    /// Subscribe to history changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<TransitionMetrics>> {
        self.history.subscribe()
    }

    pub fn subscribe_reports(&self) -> broadcast::Receiver<PerformanceReport> {
        self.reports.subscribe()
    }

    pub fn reset(&self) {
        self.history.send_modify(Vec::clear);
    }

    pub fn stats(&self, adaptive_threshold_ms: u64) -> PerformanceStats {
        compute_stats(
            &self.history.borrow(),
            self.config.window,
            adaptive_threshold_ms,
            self.config.min_success_rate,
        )
    }

    /// Build a report for the current window and flag out-of-target figures.
    pub fn report(&self, adaptive_threshold_ms: u64) -> PerformanceReport {
        let stats = self.stats(adaptive_threshold_ms);
        let mut alerts = Vec::new();

        if stats.sample_size > 0 {
            if stats.success_rate < self.config.min_success_rate {
                alerts.push(format!(
                    "success rate {:.1}% is below {:.1}%",
                    stats.success_rate * 100.0,
                    self.config.min_success_rate * 100.0
                ));
            }
            if stats.average_deviation_ms > adaptive_threshold_ms as f64 {
                alerts.push(format!(
                    "average deviation {:.0}ms exceeds {adaptive_threshold_ms}ms",
                    stats.average_deviation_ms
                ));
            }
        }

        PerformanceReport {
            generated_at: Utc::now(),
            stats,
            alerts,
        }
    }

    /// Emit a report every `interval_secs` until `shutdown` fires.
    ///
    /// The threshold is read from `transition_config` on each tick so runtime
    /// reconfiguration applies to the next report.
    pub fn spawn_reporter(
        self: &Arc<Self>,
        transition_config: watch::Receiver<TransitionConfig>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let recorder = Arc::clone(self);
        let period = self.config.interval();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_secs = period.as_secs(), "performance reporter started");

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let threshold = transition_config.borrow().adaptive_threshold_ms;
                        let report = recorder.report(threshold);

                        if report.stats.sample_size == 0 {
                            debug!("no transitions recorded yet, skipping report");
                            continue;
                        }

                        if report.within_target() {
                            info!(
                                success_rate = report.stats.success_rate,
                                average_delay_ms = report.stats.average_delay_ms,
                                average_deviation_ms = report.stats.average_deviation_ms,
                                sample_size = report.stats.sample_size,
                                "transition performance within target"
                            );
                        } else {
                            warn!(
                                success_rate = report.stats.success_rate,
                                average_deviation_ms = report.stats.average_deviation_ms,
                                alerts = ?report.alerts,
                                "transition performance outside target"
                            );
                        }

                        // No subscribers is fine
                        let _ = recorder.reports.send(report);
                    }
                }
            }

            info!("performance reporter stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RequestId;
    use std::time::Duration;

    fn metrics(target_ms: u64, actual_ms: u64, success: bool) -> TransitionMetrics {
        let now = Utc::now();
        TransitionMetrics {
            request_id: RequestId::new(),
            started_at: now,
            ended_at: now,
            actual_delay_ms: actual_ms,
            target_delay_ms: target_ms,
            scoring_latency_ms: 0,
            network_latency_ms: 0,
            render_latency_ms: 100,
            total_latency_ms: actual_ms + 100,
            success,
            error: (!success).then(|| "failed".to_string()),
        }
    }

    fn recorder(capacity: usize) -> MetricsRecorder {
        MetricsRecorder::new(ReportingConfig {
            history_capacity: capacity,
            window: 20,
            ..Default::default()
        })
    }

    #[test]
    fn test_record_evicts_oldest() {
        let recorder = recorder(3);
        let first = metrics(1000, 1000, true);
        let first_id = first.request_id;
        recorder.record(first);
        for _ in 0..3 {
            recorder.record(metrics(1000, 1100, true));
        }

        let history = recorder.history();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|m| m.request_id != first_id));
    }

    #[test]
    fn test_default_capacity_is_fifty() {
        let recorder = MetricsRecorder::new(ReportingConfig::default());
        for _ in 0..60 {
            recorder.record(metrics(2000, 2000, true));
        }
        assert_eq!(recorder.len(), 50);
    }

    #[test]
    fn test_stats_over_window() {
        let history = vec![
            metrics(2000, 2200, true),
            metrics(2000, 1800, true),
            metrics(2000, 2600, false),
            metrics(2000, 2000, true),
        ];
        let stats = compute_stats(&history, 20, 500, 0.95);

        assert_eq!(stats.sample_size, 4);
        assert!((stats.success_rate - 0.75).abs() < f64::EPSILON);
        assert!((stats.average_delay_ms - 2150.0).abs() < f64::EPSILON);
        assert!((stats.average_deviation_ms - 250.0).abs() < f64::EPSILON);
        assert!(!stats.is_within_target);
    }

    #[test]
    fn test_stats_use_only_recent_window() {
        let mut history: Vec<_> = (0..5).map(|_| metrics(2000, 2000, false)).collect();
        history.extend((0..20).map(|_| metrics(2000, 2100, true)));
        let stats = compute_stats(&history, 20, 500, 0.95);
        assert_eq!(stats.sample_size, 20);
        assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);
        assert!(stats.is_within_target);
    }

    #[test]
    fn test_empty_stats() {
        let stats = recorder(10).stats(500);
        assert_eq!(stats, PerformanceStats::empty());
    }

    #[test]
    fn test_report_flags_deviation() {
        let recorder = recorder(10);
        recorder.record(metrics(2000, 3000, true));
        let report = recorder.report(500);
        assert!(!report.within_target());
        assert_eq!(report.alerts.len(), 1);
        assert!(report.alerts[0].contains("deviation"));
    }

    #[test]
    fn test_reset_notifies_subscribers() {
        let recorder = recorder(10);
        let mut rx = recorder.subscribe();
        recorder.record(metrics(2000, 2000, true));
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().len(), 1);

        recorder.reset();
        assert!(rx.has_changed().unwrap_or(false));
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_broadcasts_on_interval() {
        let recorder = Arc::new(MetricsRecorder::new(ReportingConfig {
            interval_secs: 30,
            ..Default::default()
        }));
        recorder.record(metrics(2000, 2050, true));
        let (_config_tx, config_rx) = watch::channel(TransitionConfig::default());
        let shutdown = CancellationToken::new();
        let mut reports = recorder.subscribe_reports();

        let handle = recorder.spawn_reporter(config_rx, shutdown.clone());

        let report = tokio::time::timeout(Duration::from_secs(31), reports.recv())
            .await
            .expect("report within interval")
            .expect("channel open");
        assert!(report.within_target());
        assert_eq!(report.stats.sample_size, 1);

        shutdown.cancel();
        handle.await.expect("reporter task should exit cleanly");
    }
}
