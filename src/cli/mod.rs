//! Command-line interface for running and inspecting transition timing.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, ConfigCommands};

/// Print an error the way the active output mode expects and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let payload = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
