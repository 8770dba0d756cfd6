//! Target delay planning.
//!
//! Computes how long a transition should take in total, from the request's
//! classification and how far recent transitions drifted from their own
//! targets. Pure: no I/O, no mutation of the history.

use serde::Serialize;
use std::time::Duration;

use crate::domain::models::{
    Complexity, NetworkCondition, TransitionConfig, TransitionContext, TransitionMetrics,
};

/// Number of recent records consulted for adaptive compensation.
pub const ADAPTIVE_WINDOW: usize = 10;

/// Fraction of the average deviation removed from the next target.
const ADAPTIVE_GAIN: f64 = 0.5;

/// Responses longer than this add a payload adjustment.
const PAYLOAD_THRESHOLD: u64 = 500;
const PAYLOAD_MS_PER_UNIT: u64 = 2;
const PAYLOAD_CAP_MS: u64 = 1000;

/// Breakdown of a planned delay. All adjustments are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayPlan {
    pub base_ms: u64,
    pub complexity_adjustment_ms: i64,
    pub network_adjustment_ms: i64,
    pub payload_adjustment_ms: i64,
    pub adaptive_adjustment_ms: i64,
    /// Sum of base and adjustments before clamping.
    pub unclamped_ms: i64,
    pub target_ms: u64,
}

impl DelayPlan {
    pub const fn target(&self) -> Duration {
        Duration::from_millis(self.target_ms)
    }

    pub fn was_clamped(&self) -> bool {
        i64::try_from(self.target_ms).map_or(true, |target| target != self.unclamped_ms)
    }
}

const fn complexity_adjustment(complexity: Complexity) -> i64 {
    match complexity {
        Complexity::High => 500,
        Complexity::Medium => 200,
        Complexity::Low => -200,
    }
}

const fn network_adjustment(network: NetworkCondition) -> i64 {
    match network {
        NetworkCondition::Slow => 800,
        NetworkCondition::Normal => 200,
        NetworkCondition::Fast => 0,
    }
}

fn payload_adjustment(response_length: u64) -> i64 {
    if response_length > PAYLOAD_THRESHOLD {
        response_length
            .saturating_mul(PAYLOAD_MS_PER_UNIT)
            .min(PAYLOAD_CAP_MS) as i64
    } else {
        0
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Mean signed deviation over the last [`ADAPTIVE_WINDOW`] records.
pub fn average_deviation_ms(history: &[TransitionMetrics]) -> f64 {
    let recent = &history[history.len().saturating_sub(ADAPTIVE_WINDOW)..];
    if recent.is_empty() {
        return 0.0;
    }
    let total: i64 = recent.iter().map(TransitionMetrics::deviation_ms).sum();
    total as f64 / recent.len() as f64
}

/// Plan a target delay with its full breakdown.
pub fn plan(
    context: &TransitionContext,
    config: &TransitionConfig,
    history: &[TransitionMetrics],
) -> DelayPlan {
    let base_ms = config.target_delay_ms;
    let complexity_adjustment_ms = complexity_adjustment(context.complexity);
    let network_adjustment_ms = network_adjustment(context.network_condition);
    let payload_adjustment_ms = payload_adjustment(context.response_length);
    let adaptive_adjustment_ms = if config.enable_adaptive {
        (-ADAPTIVE_GAIN * average_deviation_ms(history)).round() as i64
    } else {
        0
    };

    let unclamped_ms = saturating_i64(base_ms)
        .saturating_add(complexity_adjustment_ms)
        .saturating_add(network_adjustment_ms)
        .saturating_add(payload_adjustment_ms)
        .saturating_add(adaptive_adjustment_ms);
    // max-then-min never panics, even on bounds that were not validated
    let clamped = unclamped_ms
        .max(saturating_i64(config.min_delay_ms))
        .min(saturating_i64(config.max_delay_ms));
    let target_ms = u64::try_from(clamped).unwrap_or(0);

    DelayPlan {
        base_ms,
        complexity_adjustment_ms,
        network_adjustment_ms,
        payload_adjustment_ms,
        adaptive_adjustment_ms,
        unclamped_ms,
        target_ms,
    }
}

/// Target delay for a transition, clamped to the configured bounds.
pub fn compute_target(
    context: &TransitionContext,
    config: &TransitionConfig,
    history: &[TransitionMetrics],
) -> Duration {
    plan(context, config, history).target()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RequestId;
    use chrono::Utc;

    fn config(adaptive: bool) -> TransitionConfig {
        TransitionConfig {
            min_delay_ms: 1500,
            max_delay_ms: 4000,
            target_delay_ms: 2500,
            enable_adaptive: adaptive,
            ..Default::default()
        }
    }

    fn context(complexity: Complexity, network: NetworkCondition, length: u64) -> TransitionContext {
        TransitionContext::new("s", "q")
            .with_response("r", length)
            .with_complexity(complexity)
            .with_network(network)
    }

    fn record(target_ms: u64, actual_ms: u64) -> TransitionMetrics {
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
            success: true,
            error: None,
        }
    }

    #[test]
    fn test_low_fast_short_response() {
        let ctx = context(Complexity::Low, NetworkCondition::Fast, 50);
        let target = compute_target(&ctx, &config(false), &[]);
        assert_eq!(target, Duration::from_millis(2300));
    }

    #[test]
    fn test_high_slow_long_response_clamps_to_max() {
        let ctx = context(Complexity::High, NetworkCondition::Slow, 800);
        let plan = plan(&ctx, &config(false), &[]);
        assert_eq!(plan.payload_adjustment_ms, 1000);
        assert_eq!(plan.unclamped_ms, 4800);
        assert_eq!(plan.target_ms, 4000);
        assert!(plan.was_clamped());
    }

    #[test]
    fn test_payload_threshold_is_exclusive() {
        assert_eq!(payload_adjustment(500), 0);
        assert_eq!(payload_adjustment(501), 1000);
        assert_eq!(payload_adjustment(300), 0);
    }

    #[test]
    fn test_medium_normal() {
        let ctx = context(Complexity::Medium, NetworkCondition::Normal, 0);
        assert_eq!(compute_target(&ctx, &config(false), &[]).as_millis(), 2900);
    }

    #[test]
    fn test_clamps_to_min() {
        let cfg = TransitionConfig {
            min_delay_ms: 1500,
            target_delay_ms: 1500,
            ..config(false)
        };
        let ctx = context(Complexity::Low, NetworkCondition::Fast, 0);
        assert_eq!(compute_target(&ctx, &cfg, &[]).as_millis(), 1500);
    }

    #[test]
    fn test_empty_history_has_no_adaptive_term() {
        let ctx = context(Complexity::Low, NetworkCondition::Fast, 50);
        let plan = plan(&ctx, &config(true), &[]);
        assert_eq!(plan.adaptive_adjustment_ms, 0);
        assert_eq!(plan.target_ms, 2300);
    }

    #[test]
    fn test_overshoot_lowers_target() {
        let history: Vec<_> = (0..10).map(|_| record(2300, 2800)).collect();
        let ctx = context(Complexity::Low, NetworkCondition::Fast, 50);

        let adaptive = compute_target(&ctx, &config(true), &history);
        let fixed = compute_target(&ctx, &config(false), &history);
        assert!(adaptive < fixed);
        assert_eq!(adaptive.as_millis(), 2050);
    }

    #[test]
    fn test_undershoot_raises_target() {
        let history: Vec<_> = (0..4).map(|_| record(2300, 1900)).collect();
        let ctx = context(Complexity::Low, NetworkCondition::Fast, 50);
        assert_eq!(compute_target(&ctx, &config(true), &history).as_millis(), 2500);
    }

    #[test]
    fn test_huge_max_bound_does_not_panic() {
        let cfg = TransitionConfig {
            max_delay_ms: u64::MAX,
            ..config(true)
        };
        let ctx = context(Complexity::Medium, NetworkCondition::Normal, 0);
        let plan = plan(&ctx, &cfg, &[]);
        assert_eq!(plan.target_ms, 2900);
        assert!(!plan.was_clamped());
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let cfg = TransitionConfig {
            min_delay_ms: 3000,
            max_delay_ms: 1000,
            ..config(false)
        };
        let ctx = context(Complexity::Low, NetworkCondition::Fast, 0);
        assert_eq!(compute_target(&ctx, &cfg, &[]).as_millis(), 1000);
    }

    #[test]
    fn test_only_last_ten_records_count() {
        // Old records ran far over, recent ones were on target
        let mut history: Vec<_> = (0..5).map(|_| record(2000, 6000)).collect();
        history.extend((0..10).map(|_| record(2000, 2000)));
        assert!(average_deviation_ms(&history).abs() < f64::EPSILON);
    }
}
