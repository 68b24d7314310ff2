// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Integration tests for euro-config:
//!
//! - YAML and TOML loading
//! - Validation of every section
//! - Environment placeholders and overrides
//! - Feeding a loaded configuration into discovery
//!
//! Every test uses its own environment prefix so parallel tests never see
//! each other's variables.

use std::time::Duration;

use euro_config::{ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel, SupervisorConfig};
use euro_modbus::{ConnectionManager, ErrorKind, LoopId, Parity, SerialPortKind};
use euro_tests::prelude::*;

// =============================================================================
// Test Helpers
// =============================================================================

fn loader(tag: &str) -> ConfigLoader {
    ConfigLoader::new().with_env_prefix(format!("EURO_CONFIG_IT_{}", tag))
}

fn validation_field(result: Result<SupervisorConfig, ConfigError>) -> String {
    match result {
        Err(ConfigError::Validation { field, .. }) => field,
        other => panic!("Expected validation error, got {:?}", other),
    }
}

// =============================================================================
// Loading Tests
// =============================================================================

#[test]
fn test_yaml_and_toml_agree() {
    let yaml = ConfigFixtures::write(ConfigFixtures::full_yaml(), ".yaml");
    let toml = ConfigFixtures::write(ConfigFixtures::full_toml(), ".toml");

    let from_yaml = loader("AGREE").load(yaml.path()).unwrap();
    let from_toml = loader("AGREE").load(toml.path()).unwrap();

    assert_eq!(from_yaml, from_toml);
    assert_eq!(from_yaml.bus.port_kind, SerialPortKind::TtyUsb);
    assert_eq!(from_yaml.bus.response_timeout, Duration::from_millis(50));
    assert_eq!(from_yaml.poll.interval, Duration::from_secs(1));
    assert_eq!(from_yaml.logging.level, LogLevel::Info);
    assert_eq!(from_yaml.logging.format, LogFormat::Text);
}

#[test]
fn test_bus_settings_from_config() {
    let yaml = "bus:\n  baud_rate: 19200\n  parity: even\n  stop_bits: 2\n";
    let config = loader("LINE").load_from_str(yaml, ConfigFormat::Yaml).unwrap();

    let settings = config.bus.to_bus_settings().unwrap();
    assert_eq!(settings.parity, Parity::Even);
    assert_eq!(settings.line_notation(), "19200-8E2");

    let defaults = SupervisorConfig::default().bus.to_bus_settings().unwrap();
    assert_eq!(defaults.line_notation(), "19200-8N1");
}

#[test]
fn test_json_config() {
    let json = r#"{ "bus": { "port_kind": "tty", "id_range": { "start": 4, "end": 6 } } }"#;
    let config = loader("JSON").load_from_str(json, ConfigFormat::Json).unwrap();

    assert_eq!(config.bus.port_kind, SerialPortKind::Tty);
    assert_eq!(config.bus.id_range.to_range(), 4..=6);
}

#[test]
fn test_unknown_bus_field_is_rejected() {
    let toml = "[bus]\nbaud = 9600\n";
    let result = loader("UNKNOWN").load_from_str(toml, ConfigFormat::Toml);
    assert!(result.is_err());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validation_names_failing_section() {
    let cases = [
        ("bus:\n  data_bits: 9\n", "bus.data_bits"),
        ("bus:\n  stop_bits: 3\n", "bus.stop_bits"),
        ("bus:\n  id_range:\n    start: 0\n    end: 3\n", "bus.id_range"),
        ("bus:\n  id_range:\n    start: 9\n    end: 3\n", "bus.id_range"),
        ("calibration:\n  pv_resolution: 5\n", "calibration"),
        ("calibration:\n  setpoint_resolution: 2\n", "calibration"),
        ("limits:\n  max_output: 150\n", "limits"),
        ("limits:\n  max_setpoint: 0\n", "limits"),
        ("poll:\n  interval: 10ms\n", "poll.interval"),
    ];

    for (yaml, expected) in cases {
        let result = loader("VALIDATE").load_from_str(yaml, ConfigFormat::Yaml);
        assert_eq!(validation_field(result), expected, "config: {}", yaml);
    }
}

#[test]
fn test_wide_id_range_is_accepted() {
    let yaml = "bus:\n  id_range:\n    start: 1\n    end: 10\n";
    let config = loader("WIDE").load_from_str(yaml, ConfigFormat::Yaml).unwrap();
    assert_eq!(config.bus.id_range.to_range(), 1..=10);
}

#[test]
fn test_missing_file() {
    let result = loader("MISSING").load("/nonexistent/eurotherm.yaml");
    assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
}

// =============================================================================
// Environment Tests
// =============================================================================

#[test]
fn test_placeholders_resolve_from_environment() {
    std::env::set_var("EURO_CONFIG_IT_PLACEHOLDER_DIR", "/srv/dev");
    let yaml = "bus:\n  device_dir: ${EURO_CONFIG_IT_PLACEHOLDER_DIR}\n  baud_rate: ${EURO_CONFIG_IT_UNSET_BAUD:9600}\n";

    let config = loader("PLACEHOLDER").load_from_str(yaml, ConfigFormat::Yaml).unwrap();

    assert_eq!(config.bus.device_dir, std::path::PathBuf::from("/srv/dev"));
    assert_eq!(config.bus.baud_rate, 9600);
}

#[test]
fn test_placeholders_disabled() {
    std::env::set_var("EURO_CONFIG_IT_RAW_DIR", "/srv/dev");
    let yaml = "bus:\n  device_dir: ${EURO_CONFIG_IT_RAW_DIR}\n";

    let config = loader("RAW")
        .with_env_vars(false)
        .load_from_str(yaml, ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(
        config.bus.device_dir,
        std::path::PathBuf::from("${EURO_CONFIG_IT_RAW_DIR}")
    );
}

#[test]
fn test_env_overrides_apply_after_file() {
    let file = ConfigFixtures::write(ConfigFixtures::full_yaml(), ".yaml");
    std::env::set_var("EURO_CONFIG_IT_OVERRIDE_BUS_DEVICE_DIR", "/tmp/euro-devices");
    std::env::set_var("EURO_CONFIG_IT_OVERRIDE_LOG_LEVEL", "trace");
    std::env::set_var("EURO_CONFIG_IT_OVERRIDE_RECORD", "/var/log/euro.jsonl");

    let config = loader("OVERRIDE").load(file.path()).unwrap();

    assert_eq!(
        config.bus.device_dir,
        std::path::PathBuf::from("/tmp/euro-devices")
    );
    assert_eq!(config.logging.level, LogLevel::Trace);
    assert_eq!(
        config.record,
        Some(std::path::PathBuf::from("/var/log/euro.jsonl"))
    );
}

#[test]
fn test_bad_poll_interval_override() {
    std::env::set_var("EURO_CONFIG_IT_BAD_POLL_POLL_INTERVAL", "soon");
    let result = loader("BAD_POLL").load_from_str("{}", ConfigFormat::Json);
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

// =============================================================================
// Path Resolution Tests
// =============================================================================

#[test]
fn test_record_path_relative_to_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eurotherm.yaml");
    std::fs::write(&path, "record: logs/snapshots.jsonl\n").unwrap();

    let config = loader("RECORD").load(&path).unwrap();
    assert_eq!(
        config.record,
        Some(dir.path().join("logs/snapshots.jsonl"))
    );

    let raw = loader("RECORD")
        .with_path_resolution(false)
        .load(&path)
        .unwrap();
    assert_eq!(
        raw.record,
        Some(std::path::PathBuf::from("logs/snapshots.jsonl"))
    );
}

#[test]
fn test_record_path_with_base_path() {
    let config = loader("BASE")
        .with_base_path("/etc/eurotherm")
        .load_from_str("record: snapshots.jsonl\n", ConfigFormat::Yaml)
        .unwrap();
    assert_eq!(
        config.record,
        Some(std::path::PathBuf::from("/etc/eurotherm/snapshots.jsonl"))
    );

    let absolute = loader("BASE")
        .with_base_path("/etc/eurotherm")
        .load_from_str("record: /var/lib/snapshots.jsonl\n", ConfigFormat::Yaml)
        .unwrap();
    assert_eq!(
        absolute.record,
        Some(std::path::PathBuf::from("/var/lib/snapshots.jsonl"))
    );
}

// =============================================================================
// Config To Network Tests
// =============================================================================

#[tokio::test]
async fn test_loaded_config_drives_discovery() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0"]);
    let yaml = format!(
        "bus:\n  device_dir: {}\n  id_range:\n    start: 2\n    end: 4\nlimits:\n  max_output: 80\n",
        devices.path().display()
    );
    let config = loader("DISCOVER").load_from_str(&yaml, ConfigFormat::Yaml).unwrap();

    let opener = MockOpener::new().with_line("ttyUSB0", MockBus::with_responders([1, 3]));
    let manager = ConnectionManager::new(opener, config.bus.to_bus_settings().unwrap())
        .with_calibration(config.calibration)
        .with_limits(config.limits);

    let network = manager
        .discover_configured(config.bus.id_range.to_range())
        .await
        .unwrap();

    // ID 1 answers but lies outside the configured range.
    assert_eq!(network.connected_ids(), vec![3]);

    let error = network.set_output(3, LoopId::Loop1, 90.0).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Range);
    network.set_output(3, LoopId::Loop1, 80.0).await.unwrap();

    network.shutdown().await.unwrap();
}
