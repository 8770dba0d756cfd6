//! Rolling window of network round-trip samples.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::models::NetworkCondition;

/// Default number of samples kept.
pub const DEFAULT_SAMPLE_WINDOW: usize = 10;

/// Bounded rolling window of recent probe latencies.
///
/// Shared between the orchestrator and the detached probe tasks, so every
/// method takes `&self`.
#[derive(Debug)]
pub struct LatencySampler {
    samples: Mutex<VecDeque<Duration>>,
    capacity: usize,
}

impl Default for LatencySampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl LatencySampler {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn samples(&self) -> MutexGuard<'_, VecDeque<Duration>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a sample, evicting the oldest once the window is full.
    pub fn record(&self, sample: Duration) {
        let mut samples = self.samples();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Mean of the samples in the window, or `None` before the first sample.
    pub fn average(&self) -> Option<Duration> {
        let samples = self.samples();
        if samples.is_empty() {
            return None;
        }
        let total: Duration = samples.iter().sum();
        Some(total / samples.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    /// Network class implied by the current average.
    pub fn suggested_condition(&self) -> Option<NetworkCondition> {
        self.average()
            .map(|avg| NetworkCondition::from_latency_ms(avg.as_millis() as u64))
    }

    pub fn clear(&self) {
        self.samples().clear();
    }
}
