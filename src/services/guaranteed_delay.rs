//! Guaranteed-delay countdown.
//!
//! Fills whatever is left of the planned target once upstream work has
//! settled, so a transition never surfaces before its target even when
//! scoring finished instantly.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// How a countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    /// The full budget elapsed (or was zero to begin with).
    Elapsed,
    /// The cancellation token fired before the budget elapsed.
    Cancelled,
}

/// Counts down a delay budget with periodic progress callbacks.
#[derive(Debug, Clone, Copy)]
pub struct GuaranteedDelay {
    poll_interval: Duration,
}

impl GuaranteedDelay {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait out `budget`.
    ///
    /// `on_progress(remaining, percent)` is called once per tick, including a
    /// final call with zero remaining and 100 percent. A zero budget returns
    /// immediately without any callback.
    pub async fn run<F>(
        &self,
        budget: Duration,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> DelayOutcome
    where
        F: FnMut(Duration, f64),
    {
        if budget.is_zero() {
            return DelayOutcome::Elapsed;
        }

        let started = Instant::now();
        let deadline = started + budget;

        loop {
            let next_tick = (Instant::now() + self.poll_interval).min(deadline);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return DelayOutcome::Cancelled,
                () = sleep_until(next_tick) => {}
            }

            let elapsed = started.elapsed();
            let remaining = budget.saturating_sub(elapsed);
            let percent = (elapsed.as_secs_f64() / budget.as_secs_f64() * 100.0).min(100.0);
            on_progress(remaining, percent);

            if elapsed >= budget {
                return DelayOutcome::Elapsed;
            }
        }
    }
}

impl Default for GuaranteedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
