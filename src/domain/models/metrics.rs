//! Transition outcome records and aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transition::RequestId;

/// Outcome of one completed or failed transition.
///
/// Records are immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMetrics {
    pub request_id: RequestId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Time from start until the transition action was invoked.
    pub actual_delay_ms: u64,
    /// Target delay planned for this transition.
    pub target_delay_ms: u64,
    /// Time spent waiting on upstream work.
    pub scoring_latency_ms: u64,
    /// Rolling probe average at the time the record was taken.
    pub network_latency_ms: u64,
    /// Fixed estimate of the client-side render cost.
    pub render_latency_ms: u64,
    /// Time from start until the transition settled.
    pub total_latency_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl TransitionMetrics {
    /// Signed deviation of the actual delay from the planned target.
    pub const fn deviation_ms(&self) -> i64 {
        self.actual_delay_ms as i64 - self.target_delay_ms as i64
    }
}

/// Aggregate view over the most recent transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Fraction of successful transitions, 0.0-1.0.
    pub success_rate: f64,
    pub average_delay_ms: f64,
    /// Mean absolute deviation from target.
    pub average_deviation_ms: f64,
    pub sample_size: usize,
    pub is_within_target: bool,
}

impl PerformanceStats {
    pub const fn empty() -> Self {
        Self {
            success_rate: 1.0,
            average_delay_ms: 0.0,
            average_deviation_ms: 0.0,
            sample_size: 0,
            is_within_target: true,
        }
    }
}

/// Periodic report emitted by the metrics reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub stats: PerformanceStats,
    /// Human-readable reasons the window fell outside target, if any.
    pub alerts: Vec<String>,
}

impl PerformanceReport {
    pub fn within_target(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deviation_is_signed() {
        let now = Utc::now();
        let mut metrics = TransitionMetrics {
            request_id: RequestId::new(),
            started_at: now,
            ended_at: now,
            actual_delay_ms: 2000,
            target_delay_ms: 2500,
            scoring_latency_ms: 0,
            network_latency_ms: 0,
            render_latency_ms: 100,
            total_latency_ms: 2100,
            success: true,
            error: None,
        };
        assert_eq!(metrics.deviation_ms(), -500);

        metrics.actual_delay_ms = 3100;
        assert_eq!(metrics.deviation_ms(), 600);
    }
}
