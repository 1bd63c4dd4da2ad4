// Unit tests for data directory resolution

use crate::paths::{DATA_DIR_ENV, DemoPaths, PathSource};

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies the env override wins over the platform directory.
///
/// **WHY THIS MATTERS**: Tests and portable installs point the demo at a
/// throwaway directory.
#[test]
#[serial]
fn given_env_override_when_resolved_then_env_dir_used() {
    let dir = TempDir::new().expect("temp dir");
    // SAFETY: serialized with every other test touching this variable.
    unsafe { std::env::set_var(DATA_DIR_ENV, dir.path()) };

    let paths = DemoPaths::resolve().expect("resolves");

    unsafe { std::env::remove_var(DATA_DIR_ENV) };
    assert_eq!(paths.source, PathSource::EnvVar);
    assert_eq!(paths.config_dir(), dir.path());
    assert_eq!(paths.log_dir(), dir.path().join("logs"));
}

/// **VALUE**: Verifies the platform default ends in the app directory.
#[test]
#[serial]
fn given_no_override_when_resolved_then_platform_dir() {
    unsafe { std::env::remove_var(DATA_DIR_ENV) };

    if let Ok(paths) = DemoPaths::resolve() {
        assert_eq!(paths.source, PathSource::PlatformDefault);
        assert!(paths.data_dir.ends_with("bridge-demo"));
    }
}
