//! Table output formatting for CLI commands
//!
//! Renders delay plans, transition metrics and aggregate stats using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{PerformanceStats, TransitionMetrics};
use crate::services::DelayPlan;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format a delay plan as a component breakdown
    pub fn format_plan(&self, plan: &DelayPlan) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Component").add_attribute(Attribute::Bold),
            Cell::new("ms").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("base"), Cell::new(plan.base_ms)]);
        for (name, value) in [
            ("complexity", plan.complexity_adjustment_ms),
            ("network", plan.network_adjustment_ms),
            ("payload", plan.payload_adjustment_ms),
            ("adaptive", plan.adaptive_adjustment_ms),
        ] {
            table.add_row(vec![Cell::new(name), Cell::new(format!("{value:+}"))]);
        }
        table.add_row(vec![Cell::new("unclamped"), Cell::new(plan.unclamped_ms)]);

        let target = Cell::new(plan.target_ms).add_attribute(Attribute::Bold);
        let target = if self.use_colors && plan.was_clamped() {
            target.fg(Color::Yellow)
        } else {
            target
        };
        table.add_row(vec![Cell::new("target").add_attribute(Attribute::Bold), target]);

        table.to_string()
    }

    /// Format transition records, one row per transition
    pub fn format_metrics(&self, metrics: &[TransitionMetrics]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Request").add_attribute(Attribute::Bold),
            Cell::new("Target").add_attribute(Attribute::Bold),
            Cell::new("Actual").add_attribute(Attribute::Bold),
            Cell::new("Deviation").add_attribute(Attribute::Bold),
            Cell::new("Scoring").add_attribute(Attribute::Bold),
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
        ]);

        for record in metrics {
            let id = record.request_id.to_string();
            let id_short = id.get(..8).unwrap_or(&id);

            let result = match &record.error {
                None => "ok".to_string(),
                Some(error) => truncate_text(error, 40),
            };
            let result_cell = match (self.use_colors, record.success) {
                (true, true) => Cell::new(result).fg(Color::Green),
                (true, false) => Cell::new(result).fg(Color::Red),
                (false, true) => Cell::new(format!("✓ {result}")),
                (false, false) => Cell::new(format!("✗ {result}")),
            };

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(format!("{}ms", record.target_delay_ms)),
                Cell::new(format!("{}ms", record.actual_delay_ms)),
                Cell::new(format!("{:+}ms", record.deviation_ms())),
                Cell::new(format!("{}ms", record.scoring_latency_ms)),
                Cell::new(format!("{}ms", record.total_latency_ms)),
                result_cell,
            ]);
        }

        table.to_string()
    }

    /// Format aggregate stats as a two-column summary
    pub fn format_stats(&self, stats: &PerformanceStats) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("samples"), Cell::new(stats.sample_size)]);
        table.add_row(vec![
            Cell::new("success rate"),
            Cell::new(format!("{:.1}%", stats.success_rate * 100.0)),
        ]);
        table.add_row(vec![
            Cell::new("average delay"),
            Cell::new(format!("{:.0}ms", stats.average_delay_ms)),
        ]);
        table.add_row(vec![
            Cell::new("average deviation"),
            Cell::new(format!("{:.0}ms", stats.average_deviation_ms)),
        ]);

        let verdict = if stats.is_within_target { "yes" } else { "no" };
        let verdict = if self.use_colors {
            let color = if stats.is_within_target { Color::Green } else { Color::Red };
            Cell::new(verdict).fg(color)
        } else {
            Cell::new(verdict)
        };
        table.add_row(vec![Cell::new("within target"), verdict]);

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width as u16);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
