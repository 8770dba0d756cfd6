use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Port for sampling network round-trip latency.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Measure one round-trip.
    async fn probe(&self) -> Result<Duration>;
}
