//! # Panel Configuration
//!
//! Settings that survive a restart, stored as TOML in
//! `<config dir>/walle-panel/config.toml`.
//!
//! The panel must always come up, so loading is fail-safe: a missing file is
//! created with defaults, an unreadable or corrupt one is left untouched and
//! `main` runs on defaults after logging the error. Broker port and keep-alive are protocol
//! constants (see [`crate::mqtt::connection`]) and deliberately absent here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Level};

use crate::mqtt::client::ClientSettings;
use crate::mqtt::message_loop::LoopSettings;

const CONFIG_DIR: &str = "walle-panel";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// MQTT client id, also used as window and dialog title
    pub client_id: String,
    /// Capacity of the client's request channel
    pub request_capacity: usize,
    /// Poll granularity of the message loop in milliseconds
    pub loop_tick_ms: u64,
    /// How long a graceful loop stop may take in milliseconds
    pub drain_timeout_ms: u64,
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Last address a connection succeeded to; pre-fills the address field
    pub last_address: Option<String>,
    /// Listen for a gamepad next to the panel controls
    pub gamepad: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: "WallE".to_string(),
            request_capacity: 10,
            loop_tick_ms: 500,
            drain_timeout_ms: 2000,
            log_level: "info".to_string(),
            last_address: None,
            gamepad: true,
        }
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Loads the configuration at `path`, writing defaults there if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No configuration at {}, writing defaults", path.display());
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                eyre!("Failed to create config directory {}: {}", parent.display(), e)
            })?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        fs::write(path, content)
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;
        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            client_id: self.client_id.clone(),
            request_capacity: self.request_capacity.max(1),
            loop_settings: LoopSettings {
                tick: Duration::from_millis(self.loop_tick_ms.max(1)),
                drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            },
        }
    }

    /// Parsed log level; unknown names fall back to `INFO`.
    pub fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load_keeps_last_address() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = Config {
            last_address: Some("10.0.0.5".into()),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.last_address.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "client_id = \"Eve\"\n").unwrap();

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config.client_id, "Eve");
        assert_eq!(config.request_capacity, 10);
        assert_eq!(config.last_address, None);
        assert!(config.gamepad);
    }

    #[test]
    fn test_corrupt_file_is_an_error_and_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "client_id = [").unwrap();

        let err = Config::load_or_create(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "client_id = [");
    }

    #[test]
    fn test_log_level_parsing() {
        let mut config = Config::default();
        assert_eq!(config.log_level(), Level::INFO);
        config.log_level = "debug".into();
        assert_eq!(config.log_level(), Level::DEBUG);
        config.log_level = "chatty".into();
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn test_client_settings_follow_config() {
        let config = Config {
            loop_tick_ms: 50,
            request_capacity: 0,
            ..Config::default()
        };
        let settings = config.client_settings();
        assert_eq!(settings.client_id, "WallE");
        assert_eq!(settings.request_capacity, 1);
        assert_eq!(settings.loop_settings.tick, Duration::from_millis(50));
    }
}
