pub mod config;
pub mod metrics;
pub mod transition;

pub use config::{
    Config, LoggingConfig, ReportingConfig, TimingConfig, TransitionConfig, TransitionConfigPatch,
};
pub use metrics::{PerformanceReport, PerformanceStats, TransitionMetrics};
pub use transition::{
    Complexity, NetworkCondition, Priority, RequestId, TransitionContext, TransitionPhase,
    TransitionState,
};
