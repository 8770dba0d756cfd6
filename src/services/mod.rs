pub mod delay_planner;
pub mod executor_adapter;
pub mod guaranteed_delay;
pub mod latency_sampler;
pub mod metrics_recorder;
pub mod transition_orchestrator;
pub mod upstream_waiter;

pub use delay_planner::{compute_target, DelayPlan};
pub use executor_adapter::TransitionExecutorAdapter;
pub use guaranteed_delay::{DelayOutcome, GuaranteedDelay};
pub use latency_sampler::LatencySampler;
pub use metrics_recorder::MetricsRecorder;
pub use transition_orchestrator::TransitionOrchestrator;
pub use upstream_waiter::{UpstreamReport, UpstreamWaiter};
