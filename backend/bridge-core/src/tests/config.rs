// Unit tests for config load/save/validate

use crate::config::{BridgeConfig, CONFIG_FILE_NAME, dev_mode_from_env};
use crate::error::config::ConfigError;
use crate::ipc::ExitDelay;

use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies a missing config file yields the defaults instead of an
/// error.
///
/// **WHY THIS MATTERS**: First launch has no config directory at all.
#[test]
fn given_missing_file_when_loaded_then_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = BridgeConfig::load(dir.path()).expect("defaults");

    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.server.addr, "127.0.0.1:0");
    assert_eq!(config.socket_path(), "/bridge");
    assert_eq!(config.script_path(), "/bridge.js");
    assert_eq!(config.exit_delay(), ExitDelay::After(Duration::from_millis(200)));
}

/// **VALUE**: Verifies a saved config loads back unchanged and leaves no temp
/// file behind.
///
/// **BUG THIS CATCHES**: Would catch the atomic rename being skipped.
#[test]
fn given_saved_config_when_loaded_then_same_values() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.server.prefix = "/app".to_string();
    config.session.exit_delay_ms = -1;
    config.client.blur_on_close = false;

    config.save(dir.path()).expect("saved");
    let loaded = BridgeConfig::load(dir.path()).expect("loaded");

    assert_eq!(loaded, config);
    assert_eq!(loaded.socket_path(), "/app/bridge");
    assert_eq!(loaded.exit_delay(), ExitDelay::Never);
    assert!(!dir.path().join(format!("{CONFIG_FILE_NAME}.tmp")).exists());
}

/// **VALUE**: Verifies partial files fill the rest with defaults.
#[test]
fn given_partial_file_when_loaded_then_missing_fields_defaulted() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"session": {"exit_delay_ms": 0}}"#,
    )
    .expect("written");

    let config = BridgeConfig::load(dir.path()).expect("loaded");

    assert_eq!(config.exit_delay(), ExitDelay::Immediate);
    assert!(config.server.local_only);
    assert!(config.client.blur_on_close);
}

/// **VALUE**: Verifies corrupt JSON is a parse error, not silently the defaults.
///
/// **BUG THIS CATCHES**: Would catch a load that swallows a broken file and
/// later overwrites the user's settings with defaults.
#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").expect("written");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies malformed paths are rejected by validation.
#[test]
fn given_bad_paths_when_validated_then_validation_error() {
    let mut trailing = BridgeConfig::default();
    trailing.server.prefix = "/app/".to_string();
    assert!(matches!(
        trailing.validate(),
        Err(ConfigError::ValidationError { .. })
    ));

    let mut relative = BridgeConfig::default();
    relative.server.server_path = "bridge".to_string();
    assert!(matches!(
        relative.validate(),
        Err(ConfigError::ValidationError { .. })
    ));

    for route_syntax in ["/{name}", "/:id", "/*rest", "/a//b", "/with space"] {
        let mut config = BridgeConfig::default();
        config.server.server_path = route_syntax.to_string();
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{route_syntax} must be rejected"
        );
    }

    let mut future = BridgeConfig::default();
    future.version = 99;
    let dir = TempDir::new().expect("temp dir");
    assert!(future.save(dir.path()).is_err());
    assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
}

/// **VALUE**: Verifies the dev flag can come from the environment.
///
/// **WHY THIS MATTERS**: Dev tracing is switched on without editing config.
#[test]
#[serial]
fn given_dev_env_when_read_then_dev_enabled() {
    // SAFETY: serialized with every other test touching these variables.
    unsafe {
        std::env::remove_var("dev");
        std::env::set_var("BRIDGE_DEV", "1");
    }
    assert!(dev_mode_from_env());
    assert!(BridgeConfig::default().dev_enabled());

    unsafe { std::env::set_var("BRIDGE_DEV", "off") };
    assert!(!dev_mode_from_env());

    unsafe { std::env::remove_var("BRIDGE_DEV") };
    assert!(!dev_mode_from_env());
}
