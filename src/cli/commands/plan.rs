//! Implementation of the `pacer plan` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::RequestArgs;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Complexity, Config, NetworkCondition};
use crate::services::delay_planner::{self, DelayPlan};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub complexity: Complexity,
    pub network: NetworkCondition,
    pub response_length: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub plan: DelayPlan,
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Delay plan for {} complexity, {} network, response length {}",
            self.complexity, self.network, self.response_length
        )];
        lines.push(TableFormatter::new().format_plan(&self.plan));
        if self.plan.was_clamped() {
            lines.push(format!(
                "Target clamped to [{}ms, {}ms]",
                self.min_delay_ms, self.max_delay_ms
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Plan a delay with no history, so no adaptive adjustment applies.
pub fn build(args: &PlanArgs, config: &Config) -> PlanOutput {
    let context = args.request.context("cli", "plan", "plan");
    PlanOutput {
        complexity: args.request.complexity,
        network: args.request.network,
        response_length: args.request.response_length,
        min_delay_ms: config.transition.min_delay_ms,
        max_delay_ms: config.transition.max_delay_ms,
        plan: delay_planner::plan(&context, &config.transition, &[]),
    }
}

pub fn execute(args: PlanArgs, config: &Config, json_mode: bool) -> Result<()> {
    output(&build(&args, config), json_mode);
    Ok(())
}
