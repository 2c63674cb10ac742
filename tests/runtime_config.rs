//! Integration tests for runtime configuration
//!
//! Writes a config with `Runtime::init`, loads it back, and checks that the
//! loaded settings reach queues and drivers.

use std::time::Duration;

use cadence::runtime::config::CONFIG_FILE;
use cadence::runtime::error::{ConfigError, RuntimeError};
use cadence::runtime::scheduler::QueueId;
use cadence::{Runtime, RuntimeConfig};
use tempfile::TempDir;

#[test]
fn test_init_then_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);
    let config = RuntimeConfig {
        tick_interval_ms: 20,
        debug: false,
        debug_filters: vec!["intro".to_string()],
        history_limit: 2,
        stop_when_drained: false,
    };

    Runtime::init(&path, &config).unwrap();
    let mut runtime = Runtime::load(&path).unwrap();

    assert_eq!(runtime.config().tick_interval(), Duration::from_millis(20));
    assert_eq!(runtime.config().debug_filters, vec!["intro"]);
    assert!(!runtime.config().debug);

    let id = QueueId::new("main");
    runtime.create_queue(id.clone()).unwrap();
    let timed = runtime.timed_queue(&id).unwrap();
    assert_eq!(timed.speed(), Duration::from_millis(20));
}

#[test]
fn test_load_missing_config() {
    let temp = TempDir::new().unwrap();
    let err = Runtime::load(&temp.path().join(CONFIG_FILE))
        .err()
        .unwrap();
    assert!(matches!(err, RuntimeError::Config(ConfigError::NotFound(_))));
}

#[test]
fn test_partial_config_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);
    std::fs::write(&path, r#"{ "tick_interval_ms": 5 }"#).unwrap();

    let runtime = Runtime::load(&path).unwrap();
    assert_eq!(runtime.config().tick_interval_ms, 5);
    assert!(runtime.config().debug);
    assert_eq!(runtime.config().history_limit, 64);
}
