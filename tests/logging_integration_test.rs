// Integration tests for logging functionality
// Note: initialization installs a global subscriber, so this file holds a
// single test

use pacer::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};
use std::fs;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();

    let config = LogConfig {
        level: "info".to_string(),
        format: LogFormat::Json,
        log_dir: Some(temp_dir.path().to_path_buf()),
        enable_stderr: false,
        rotation: RotationPolicy::Never,
    };

    let logger = LoggerImpl::init(&config).unwrap();
    assert!(logger.has_file_output());

    info!("transition planned");
    warn!(request_id = "abc", "transition failed");
    assert_eq!(instrumented_plan(2300), 2300);

    // A second subscriber cannot be installed
    assert!(LoggerImpl::init(&LogConfig::default()).is_err());

    // Dropping the logger flushes the non-blocking writer
    drop(logger);

    let contents = fs::read_to_string(temp_dir.path().join("pacer.log")).unwrap();
    assert!(contents.contains("transition planned"));
    assert!(contents.contains("transition failed"));
    assert!(contents.contains("\"request_id\":\"abc\""));
    assert!(contents.contains("instrumented_plan"));

    for line in contents.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("every line is JSON");
    }
}

#[instrument]
fn instrumented_plan(target_ms: u64) -> u64 {
    info!("inside instrumented span");
    target_ms
}
