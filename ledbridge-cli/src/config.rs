//! Configuration file support for ledbridge.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (LEDBRIDGE_*)
//! 3. Local config file (./ledbridge.toml)
//! 4. Global config file (~/.config/ledbridge/config.toml)
//!
//! `--config PATH` replaces both files.

use clap::ValueEnum;
use directories::ProjectDirs;
use ledbridge::LinkConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Local config file name.
const LOCAL_CONFIG: &str = "ledbridge.toml";

/// What `POST /` answers after dispatching a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PostMode {
    /// Redirect to `GET /` with the outcome in the query string.
    #[default]
    Redirect,
    /// Render the page in place.
    Render,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: Option<String>,
    /// Listen port.
    pub port: Option<u16>,
    /// POST response style.
    pub post_mode: Option<PostMode>,
}

/// Serial device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Fixed serial port (skips Arduino auto-detection).
    pub serial: Option<String>,
    /// Baud rate.
    pub baud: Option<u32>,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Wait after opening the port, in milliseconds.
    pub settle_ms: Option<u64>,
    /// Wait between command and reply check, in milliseconds.
    pub reply_wait_ms: Option<u64>,
}

impl DeviceConfig {
    /// Link configuration with file values over built-in defaults.
    pub fn link_config(&self) -> LinkConfig {
        let defaults = LinkConfig::default();
        LinkConfig {
            port_name: self.serial.clone(),
            baud_rate: self.baud.unwrap_or(defaults.baud_rate),
            read_timeout: self
                .read_timeout_ms
                .map_or(defaults.read_timeout, Duration::from_millis),
            settle_delay: self
                .settle_ms
                .map_or(defaults.settle_delay, Duration::from_millis),
            reply_wait: self
                .reply_wait_ms
                .map_or(defaults.reply_wait, Duration::from_millis),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Serial device configuration.
    #[serde(default)]
    pub device: DeviceConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG)) {
            debug!("Loaded local config from {LOCAL_CONFIG}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ledbridge").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one; set values in `other` win.
    fn merge(&mut self, other: Self) {
        let Self { server, device } = other;

        if server.bind.is_some() {
            self.server.bind = server.bind;
        }
        if server.port.is_some() {
            self.server.port = server.port;
        }
        if server.post_mode.is_some() {
            self.server.post_mode = server.post_mode;
        }

        if device.serial.is_some() {
            self.device.serial = device.serial;
        }
        if device.baud.is_some() {
            self.device.baud = device.baud;
        }
        if device.read_timeout_ms.is_some() {
            self.device.read_timeout_ms = device.read_timeout_ms;
        }
        if device.settle_ms.is_some() {
            self.device.settle_ms = device.settle_ms;
        }
        if device.reply_wait_ms.is_some() {
            self.device.reply_wait_ms = device.reply_wait_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Default values ----

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.server.bind.is_none());
        assert!(config.server.port.is_none());
        assert!(config.server.post_mode.is_none());
        assert!(config.device.serial.is_none());
        assert!(config.device.baud.is_none());
    }

    #[test]
    fn test_default_post_mode_is_redirect() {
        assert_eq!(PostMode::default(), PostMode::Redirect);
    }

    #[test]
    fn test_default_link_config() {
        let link = DeviceConfig::default().link_config();
        assert_eq!(link, LinkConfig::default());
    }

    #[test]
    fn test_link_config_from_device_section() {
        let device = DeviceConfig {
            serial: Some("/dev/ttyACM0".to_string()),
            baud: Some(115200),
            read_timeout_ms: Some(500),
            settle_ms: Some(0),
            reply_wait_ms: Some(250),
        };
        let link = device.link_config();
        assert_eq!(link.port_name.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(link.baud_rate, 115200);
        assert_eq!(link.read_timeout, Duration::from_millis(500));
        assert_eq!(link.settle_delay, Duration::ZERO);
        assert_eq!(link.reply_wait, Duration::from_millis(250));
    }

    // ---- Config merge ----

    #[test]
    fn test_config_merge_overrides() {
        let mut base = Config::default();
        base.server.port = Some(5000);
        base.device.baud = Some(9600);

        let mut other = Config::default();
        other.server.port = Some(8080);
        other.server.post_mode = Some(PostMode::Render);
        other.device.serial = Some("COM3".to_string());

        base.merge(other);

        assert_eq!(base.server.port, Some(8080));
        assert_eq!(base.server.post_mode, Some(PostMode::Render));
        assert_eq!(base.device.serial.as_deref(), Some("COM3"));
        assert_eq!(base.device.baud, Some(9600));
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.server.bind = Some("0.0.0.0".to_string());
        base.device.settle_ms = Some(1500);

        base.merge(Config::default());

        assert_eq!(base.server.bind.as_deref(), Some("0.0.0.0"));
        assert_eq!(base.device.settle_ms, Some(1500));
    }

    // ---- TOML deserialization ----

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[server]
bind = "0.0.0.0"
port = 8080
post_mode = "render"

[device]
serial = "/dev/ttyUSB0"
baud = 9600
settle_ms = 2500
reply_wait_ms = 200
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.server.post_mode, Some(PostMode::Render));
        assert_eq!(config.device.serial.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.device.settle_ms, Some(2500));
        assert_eq!(config.device.reply_wait_ms, Some(200));
        assert!(config.device.read_timeout_ms.is_none());
    }

    #[test]
    fn test_config_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.server.port.is_none());
        assert!(config.device.serial.is_none());
    }

    #[test]
    fn test_config_rejects_unknown_post_mode() {
        let result: Result<Config, _> = toml::from_str("[server]\npost_mode = \"bounce\"\n");
        assert!(result.is_err());
    }

    // ---- load_from_path with tempfile ----

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledbridge.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9000
[device]
serial = "/dev/ttyACM1"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.server.port, Some(9000));
        assert_eq!(config.device.serial.as_deref(), Some("/dev/ttyACM1"));
    }

    #[test]
    fn test_load_from_path_invalid_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let config = Config::load_from_path(&path);
        assert!(config.server.port.is_none());
    }

    #[test]
    fn test_load_from_path_nonexistent() {
        let config = Config::load_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.device.serial.is_none());
    }

    // ---- global_config_path ----

    #[test]
    fn test_global_config_path_is_some() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_str().unwrap().contains("ledbridge"));
            assert!(p.to_str().unwrap().ends_with("config.toml"));
        }
    }
}
