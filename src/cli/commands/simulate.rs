//! Implementation of the `pacer simulate` command.
//!
//! Wires an orchestrator to simulated scoring and rendering over a
//! [`SignalBus`] and runs a series of transitions back to back.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::RequestArgs;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, PerformanceStats, TransitionMetrics};
use crate::infrastructure::signals::{SignalBus, SignalScoring, SignalTransitionExecutor};
use crate::infrastructure::simulated::{
    spawn_scoring_completion, spawn_simulated_renderer, SimulatedPreloader, SimulatedProbe,
};
use crate::services::TransitionOrchestrator;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of transitions to run
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: usize,

    /// Simulated scoring latency in milliseconds
    #[arg(long, default_value_t = 800)]
    pub scoring_ms: u64,

    /// Simulated render latency in milliseconds
    #[arg(long, default_value_t = 50)]
    pub render_ms: u64,

    /// Simulated network round-trip in milliseconds
    #[arg(long, default_value_t = 40)]
    pub probe_ms: u64,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Debug, Serialize)]
pub struct SimulateOutput {
    pub transitions: Vec<TransitionMetrics>,
    pub stats: PerformanceStats,
    pub failures: usize,
}

impl CommandOutput for SimulateOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut lines = vec![
            format!("Ran {} transition(s)", self.transitions.len()),
            formatter.format_metrics(&self.transitions),
            formatter.format_stats(&self.stats),
        ];
        if self.failures > 0 {
            lines.push(format!("{} transition(s) failed", self.failures));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn run(args: &SimulateArgs, config: &Config) -> Result<SimulateOutput> {
    let bus = SignalBus::default();
    let (commands_tx, commands_rx) = mpsc::channel(8);
    let renderer = spawn_simulated_renderer(
        commands_rx,
        bus.clone(),
        Duration::from_millis(args.render_ms),
    );

    let orchestrator = TransitionOrchestrator::new(
        config,
        Arc::new(SignalScoring::new(bus.clone())),
        Arc::new(SignalTransitionExecutor::new(commands_tx, bus.clone())),
    )
    .context("Invalid transition configuration")?
    .with_preloader(Arc::new(SimulatedPreloader::new(Duration::from_millis(20))))
    .with_probe(Arc::new(SimulatedProbe::new(Duration::from_millis(args.probe_ms))));

    let scoring_latency = Duration::from_millis(args.scoring_ms);
    let mut failures = 0;
    for index in 0..args.count {
        let response_id = format!("response-{index}");
        let context = args
            .request
            .context("simulation", &format!("question-{index}"), &response_id);

        let _completion = spawn_scoring_completion(&bus, response_id, scoring_latency);
        match orchestrator.start_transition(context).await {
            Ok(metrics) => info!(
                index,
                target_ms = metrics.target_delay_ms,
                actual_ms = metrics.actual_delay_ms,
                "simulated transition complete"
            ),
            Err(err) => {
                failures += 1;
                warn!(index, error = %err, "simulated transition failed");
            }
        }
    }

    let output = SimulateOutput {
        transitions: orchestrator.metrics_history(),
        stats: orchestrator.performance_stats(),
        failures,
    };

    orchestrator.shutdown();
    // The orchestrator owns the last command sender
    drop(orchestrator);
    renderer.await.context("Simulated renderer panicked")?;

    Ok(output)
}

pub async fn execute(args: SimulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let result = run(&args, config).await?;
    output(&result, json_mode);
    Ok(())
}
