//! CLI command implementations.

pub mod config;
pub mod plan;
pub mod simulate;

use clap::Args;

use crate::domain::models::{Complexity, NetworkCondition, TransitionContext};

/// Transition characteristics shared by `plan` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Complexity of the submitted response (low, medium, high)
    #[arg(long, default_value = "medium")]
    pub complexity: Complexity,

    /// Network condition (fast, normal, slow)
    #[arg(long, default_value = "normal")]
    pub network: NetworkCondition,

    /// Length of the submitted response
    #[arg(long, default_value_t = 0)]
    pub response_length: u64,
}

impl RequestArgs {
    pub fn context(&self, session_id: &str, question_id: &str, response_id: &str) -> TransitionContext {
        TransitionContext::new(session_id, question_id)
            .with_response(response_id, self.response_length)
            .with_complexity(self.complexity)
            .with_network(self.network)
    }
}
