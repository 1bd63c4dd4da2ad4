//! Where the demo keeps its config and logs.

use crate::error::DemoError;

use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};

/// Overrides the platform data directory.
pub const DATA_DIR_ENV: &str = "BRIDGE_DEMO_DIR";

const APP_DIR_NAME: &str = "bridge-demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    EnvVar,
    PlatformDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoPaths {
    pub data_dir: PathBuf,
    pub source: PathSource,
}

impl DemoPaths {
    /// `$BRIDGE_DEMO_DIR` if set, else `{local data dir}/bridge-demo`.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Demo`] when neither is available.
    pub fn resolve() -> Result<Self, DemoError> {
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            let data_dir = PathBuf::from(dir);
            info!("Using {DATA_DIR_ENV} override: {}", data_dir.display());
            return Ok(Self {
                data_dir,
                source: PathSource::EnvVar,
            });
        }

        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| DemoError::demo("No local data directory on this platform"))?
            .join(APP_DIR_NAME);
        debug!("Platform data dir: {}", data_dir.display());
        Ok(Self {
            data_dir,
            source: PathSource::PlatformDefault,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Loads `.env` from the working directory, then next to the executable.
pub fn load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        return Some(path);
    }
    let env_path = env::current_exe().ok()?.parent()?.join(".env");
    dotenvy::from_path(&env_path).ok()?;
    Some(env_path)
}
