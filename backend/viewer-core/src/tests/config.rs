// Unit tests for bridge configuration defaults and validation.

use crate::config::BridgeConfig;
use crate::{VIEWER_BINARY, VIEWER_ENDPOINT};

use std::path::PathBuf;

/// **VALUE**: Verifies the out-of-the-box configuration points at the
/// well-known viewer binary and endpoint with the documented timings.
///
/// **WHY THIS MATTERS**: A fresh install has no config file; these defaults
/// are the actual production configuration for most users.
///
/// **BUG THIS CATCHES**: Would catch a default drifting away from the fixed
/// endpoint string the viewer listens on.
#[test]
fn given_no_config_file_when_defaulted_then_well_known_values() {
    let config = BridgeConfig::default();

    assert_eq!(config.viewer.viewer_path, PathBuf::from(VIEWER_BINARY));
    assert_eq!(config.viewer.endpoint, VIEWER_ENDPOINT);
    assert_eq!(config.viewer.send_timeout_ms, 300);
    assert_eq!(config.viewer.receive_timeout_ms, 300);
    assert_eq!(config.polling.boot_poll_ms, 500);
    assert_eq!(config.polling.scene_poll_ms, 300);
    config.validate().expect("defaults must validate");
}

/// **VALUE**: Verifies validation rejects endpoints that the transport could
/// never dial.
#[test]
fn given_non_ipc_endpoint_when_validated_then_error() {
    let mut config = BridgeConfig::default();
    config.viewer.endpoint = "http://127.0.0.1:4096".to_string();

    assert!(config.validate().is_err());
}

/// **VALUE**: Verifies zeroed timings are refused. A zero transport timeout
/// would make every blocking call fail immediately, and a zero poll interval
/// would spin.
#[test]
fn given_zero_timings_when_validated_then_error() {
    let mut config = BridgeConfig::default();
    config.viewer.send_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.polling.boot_poll_ms = 0;
    assert!(config.validate().is_err());
}

/// **VALUE**: Verifies the save/load cycle through the atomic writer
/// preserves the configuration.
///
/// **BUG THIS CATCHES**: Would catch the temp-file rename writing to the
/// wrong final path, or a serialize/deserialize asymmetry in the settings
/// structs.
#[test]
fn given_saved_config_when_loaded_then_values_survive() {
    let dir = tempfile::TempDir::new().expect("temp config dir");

    let mut config = BridgeConfig::default();
    config.viewer.endpoint = "ipc://integration-viewer".to_string();
    config.polling.boot_poll_ms = 750;

    config.save(dir.path()).expect("save should succeed");
    let loaded = BridgeConfig::load(dir.path()).expect("load should succeed");

    assert_eq!(loaded.viewer.endpoint, "ipc://integration-viewer");
    assert_eq!(loaded.polling.boot_poll_ms, 750);
}

/// **VALUE**: Verifies missing fields in a partial config file fall back to
/// defaults instead of failing the parse.
///
/// **BUG THIS CATCHES**: Would catch a field added without a serde default,
/// which would break every existing user config on upgrade.
#[test]
fn given_partial_json_when_parsed_then_missing_fields_defaulted() {
    let json = r#"{ "viewer": { "endpoint": "ipc://custom-viewer" } }"#;

    let config: BridgeConfig = serde_json::from_str(json).expect("partial config should parse");

    assert_eq!(config.viewer.endpoint, "ipc://custom-viewer");
    assert_eq!(config.viewer.send_timeout_ms, 300);
    assert_eq!(config.polling.watchdog_interval_ms, 50);
}
