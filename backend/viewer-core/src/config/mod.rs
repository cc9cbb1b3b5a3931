use crate::error::config::ConfigError;
use crate::{VIEWER_BINARY, VIEWER_ENDPOINT};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;

const ENDPOINT_PREFIX: &str = "ipc://";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerSettings {
    /// Viewer executable; a bare name resolves through PATH.
    #[serde(default = "default_viewer_path")]
    pub viewer_path: PathBuf,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_command_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_command_timeout_ms")]
    pub receive_timeout_ms: u64,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            viewer_path: default_viewer_path(),
            endpoint: default_endpoint(),
            send_timeout_ms: default_command_timeout_ms(),
            receive_timeout_ms: default_command_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
    #[serde(default = "default_boot_poll_ms")]
    pub boot_poll_ms: u64,
    #[serde(default = "default_scene_poll_ms")]
    pub scene_poll_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            watchdog_interval_ms: default_watchdog_interval_ms(),
            boot_poll_ms: default_boot_poll_ms(),
            scene_poll_ms: default_scene_poll_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub viewer: ViewerSettings,

    #[serde(default)]
    pub polling: PollingSettings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            viewer: ViewerSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_viewer_path() -> PathBuf {
    PathBuf::from(VIEWER_BINARY)
}
fn default_endpoint() -> String {
    VIEWER_ENDPOINT.to_string()
}
fn default_command_timeout_ms() -> u64 {
    300
}
fn default_watchdog_interval_ms() -> u64 {
    50
}
fn default_boot_poll_ms() -> u64 {
    500
}
fn default_scene_poll_ms() -> u64 {
    300
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// A missing file yields defaults; a present but corrupt file is an
    /// error rather than silently replaced.
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

    /// Save config to {config_dir}/config.json using atomic write
    /// (temp file + rename, so a crash never leaves a torn file).
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

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if !self.viewer.endpoint.starts_with(ENDPOINT_PREFIX) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid endpoint '{}' (expected an {}<name> address)",
                    self.viewer.endpoint, ENDPOINT_PREFIX
                ),
            });
        }

        if self.viewer.send_timeout_ms == 0 || self.viewer.receive_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "Command timeouts must be non-zero".to_string(),
            });
        }

        if self.polling.watchdog_interval_ms == 0
            || self.polling.boot_poll_ms == 0
            || self.polling.scene_poll_ms == 0
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "Polling intervals must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
