use crate::error::config::ConfigError;
use crate::ipc::ExitDelay;
use crate::{DEFAULT_HOST_ADDR, DEFAULT_SERVER_PATH};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "bridge.json";
const CONFIG_VERSION: u32 = 1;

/// Environment variables that turn on dev mode, checked in order.
pub const DEV_ENV_KEYS: [&str; 2] = ["BRIDGE_DEV", "dev"];

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port` to listen on; port 0 picks a free one.
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Path prefix in front of every route, e.g. `/app`.
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_server_path")]
    pub server_path: String,
    /// Whether the page is served over TLS (`wss://` in the client).
    #[serde(default)]
    pub tls: bool,
    /// Refuse connections from non-loopback addresses.
    #[serde(default = "default_true")]
    pub local_only: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            prefix: String::new(),
            server_path: default_server_path(),
            tls: false,
            local_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Milliseconds to wait for a reconnection after the last connection
    /// closes. Negative never exits, zero exits at once.
    #[serde(default = "default_exit_delay_ms")]
    pub exit_delay_ms: i64,
    #[serde(default)]
    pub reply_unknown_calls: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exit_delay_ms: default_exit_delay_ms(),
            reply_unknown_calls: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Blur the page when the connection drops.
    #[serde(default = "default_true")]
    pub blur_on_close: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            blur_on_close: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub dev: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            client: ClientConfig::default(),
            dev: false,
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_addr() -> String {
    DEFAULT_HOST_ADDR.to_string()
}
fn default_server_path() -> String {
    DEFAULT_SERVER_PATH.to_string()
}
fn default_exit_delay_ms() -> i64 {
    200
}
fn default_true() -> bool {
    true
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Load config from {config_dir}/bridge.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(BridgeConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/bridge.json using atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// the write or the final rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        // Atomic rename (POSIX guarantees atomicity)
        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.server.addr.is_empty() {
            return Err(ConfigError::validation("server.addr cannot be empty"));
        }

        if !self.server.server_path.starts_with('/') || self.server.server_path.len() < 2 {
            return Err(ConfigError::validation(format!(
                "Invalid server_path: '{}' (must start with '/')",
                self.server.server_path
            )));
        }

        if !self.server.prefix.is_empty()
            && (!self.server.prefix.starts_with('/') || self.server.prefix.ends_with('/'))
        {
            return Err(ConfigError::validation(format!(
                "Invalid prefix: '{}' (must start with '/' and not end with one)",
                self.server.prefix
            )));
        }

        for (field, path) in [
            ("server.prefix", &self.server.prefix),
            ("server.server_path", &self.server.server_path),
        ] {
            if !is_literal_path(path) {
                return Err(ConfigError::validation(format!(
                    "Invalid {field}: '{path}' (use letters, digits, '-_.~' and single '/')"
                )));
            }
        }

        Ok(())
    }

    pub fn exit_delay(&self) -> ExitDelay {
        ExitDelay::from_millis(self.session.exit_delay_ms)
    }

    /// Path of the websocket endpoint, `{prefix}{server_path}`.
    pub fn socket_path(&self) -> String {
        format!("{}{}", self.server.prefix, self.server.server_path)
    }

    /// Path of the client script, the socket path plus `.js`.
    pub fn script_path(&self) -> String {
        format!("{}.js", self.socket_path())
    }

    /// Whether `path` addresses the page root: `{prefix}`, `{prefix}/` or
    /// `{prefix}/index.html`.
    pub fn is_page_path(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix(self.server.prefix.as_str()) else {
            return false;
        };
        matches!(rest, "" | "/" | "/index.html")
    }

    /// True when the config or the environment asks for dev mode.
    pub fn dev_enabled(&self) -> bool {
        self.dev || dev_mode_from_env()
    }
}

/// Reads [`DEV_ENV_KEYS`]; the first one set decides.
pub fn dev_mode_from_env() -> bool {
    DEV_ENV_KEYS
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// A plain route path: no empty segments, no route syntax, nothing to escape.
fn is_literal_path(path: &str) -> bool {
    !path.contains("//")
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~'))
}
