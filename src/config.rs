//! Router Configuration
//!
//! Loads configuration from YAML files with a cascading priority system:
//! 1. `./fanin.yaml` (current directory - highest priority)
//! 2. `~/.config/fanin/fanin.yaml` (user config directory)
//! 3. `/etc/fanin/fanin.yaml` (system - lowest priority)
//!
//! Values from higher priority files override those from lower priority
//! files. Fields are kept as `Option` so "explicitly set" and "absent"
//! stay distinguishable during the merge; the accessor methods apply
//! defaults.
//!
//! ```yaml
//! router:
//!   delivery:
//!     mandatory: true
//!   limits:
//!     max_peers: 1024
//!   buffers:
//!     event_channel: 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config filename.
const CONFIG_FILENAME: &str = "fanin.yaml";

/// Default peer cap (0 = unlimited).
const DEFAULT_MAX_PEERS: usize = 1024;

/// Default channel depth for all channel buffers.
const DEFAULT_CHANNEL_BUFFER: usize = 1024;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Delivery policy (`router.delivery.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Socket-level default for the mandatory flag
    /// (`router.delivery.mandatory`). Individual sends may still
    /// override this per call.
    #[serde(default)]
    pub mandatory: Option<bool>,
}

impl DeliveryConfig {
    /// Whether sends to unreachable identities fail (default: false,
    /// silent drop).
    pub fn mandatory(&self) -> bool {
        self.mandatory.unwrap_or(false)
    }
}

/// Resource limits (`router.limits.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Max simultaneously connected peers (`router.limits.max_peers`).
    /// 0 = unlimited.
    #[serde(default)]
    pub max_peers: Option<usize>,
}

impl LimitsConfig {
    /// Max simultaneously connected peers (default: 1024).
    pub fn max_peers(&self) -> usize {
        self.max_peers.unwrap_or(DEFAULT_MAX_PEERS)
    }
}

/// Channel buffer sizes (`router.buffers.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuffersConfig {
    /// Transport event channel depth (`router.buffers.event_channel`).
    #[serde(default)]
    pub event_channel: Option<usize>,
    /// Application command channel depth
    /// (`router.buffers.command_channel`).
    #[serde(default)]
    pub command_channel: Option<usize>,
    /// Outbound transmit channel depth
    /// (`router.buffers.transmit_channel`).
    #[serde(default)]
    pub transmit_channel: Option<usize>,
}

impl BuffersConfig {
    /// Transport event channel depth (default: 1024).
    pub fn event_channel(&self) -> usize {
        self.event_channel.unwrap_or(DEFAULT_CHANNEL_BUFFER)
    }

    /// Application command channel depth (default: 1024).
    pub fn command_channel(&self) -> usize {
        self.command_channel.unwrap_or(DEFAULT_CHANNEL_BUFFER)
    }

    /// Outbound transmit channel depth (default: 1024).
    pub fn transmit_channel(&self) -> usize {
        self.transmit_channel.unwrap_or(DEFAULT_CHANNEL_BUFFER)
    }
}

/// Router configuration (`router.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Delivery policy (`router.delivery.*`).
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Resource limits (`router.limits.*`).
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Channel buffer sizes (`router.buffers.*`).
    #[serde(default)]
    pub buffers: BuffersConfig,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Router configuration (`router.*`).
    #[serde(default)]
    pub router: RouterConfig,
}

impl Config {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the standard search paths.
    ///
    /// Files are loaded in reverse priority order and merged:
    /// 1. `/etc/fanin/fanin.yaml` (loaded first, lowest priority)
    /// 2. `~/.config/fanin/fanin.yaml` (user config)
    /// 3. `./fanin.yaml` (loaded last, highest priority)
    ///
    /// Returns (config, paths_loaded) where paths_loaded contains the
    /// paths that were successfully loaded.
    pub fn load() -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let search_paths = Self::search_paths();
        Self::load_from_paths(&search_paths)
    }

    /// Load configuration from specific paths.
    ///
    /// Paths are processed in order, with later paths overriding earlier
    /// ones.
    pub fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut loaded_paths = Vec::new();

        for path in paths {
            if path.exists() {
                let file_config = Self::load_file(path)?;
                config.merge(file_config);
                loaded_paths.push(path.clone());
            }
        }

        Ok((config, loaded_paths))
    }

    /// Load configuration from a single file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the standard search paths in priority order (lowest to
    /// highest).
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System config (lowest priority)
        paths.push(PathBuf::from("/etc/fanin").join(CONFIG_FILENAME));

        // User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("fanin").join(CONFIG_FILENAME));
        }

        // Current directory (highest priority)
        paths.push(PathBuf::from(".").join(CONFIG_FILENAME));

        paths
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` when present —
    /// including values that happen to equal a default.
    pub fn merge(&mut self, other: Config) {
        // Merge delivery section
        if other.router.delivery.mandatory.is_some() {
            self.router.delivery.mandatory = other.router.delivery.mandatory;
        }
        // Merge limits section
        if other.router.limits.max_peers.is_some() {
            self.router.limits.max_peers = other.router.limits.max_peers;
        }
        // Merge buffers section
        if other.router.buffers.event_channel.is_some() {
            self.router.buffers.event_channel = other.router.buffers.event_channel;
        }
        if other.router.buffers.command_channel.is_some() {
            self.router.buffers.command_channel = other.router.buffers.command_channel;
        }
        if other.router.buffers.transmit_channel.is_some() {
            self.router.buffers.transmit_channel = other.router.buffers.transmit_channel;
        }
    }

    /// Serialize this configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::new();
        assert!(!config.router.delivery.mandatory());
        assert_eq!(config.router.limits.max_peers(), 1024);
        assert_eq!(config.router.buffers.event_channel(), 1024);
        // Nothing is explicitly set
        assert!(config.router.delivery.mandatory.is_none());
        assert!(config.router.limits.max_peers.is_none());
    }

    #[test]
    fn test_parse_yaml_full() {
        let yaml = r#"
router:
  delivery:
    mandatory: true
  limits:
    max_peers: 64
  buffers:
    event_channel: 32
    command_channel: 16
    transmit_channel: 8
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.router.delivery.mandatory());
        assert_eq!(config.router.limits.max_peers(), 64);
        assert_eq!(config.router.buffers.event_channel(), 32);
        assert_eq!(config.router.buffers.command_channel(), 16);
        assert_eq!(config.router.buffers.transmit_channel(), 8);
    }

    #[test]
    fn test_parse_yaml_empty() {
        let config: Config = serde_yaml::from_str("").unwrap();
        assert!(!config.router.delivery.mandatory());
    }

    #[test]
    fn test_parse_yaml_partial() {
        let yaml = r#"
router:
  delivery:
    mandatory: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.router.delivery.mandatory());
        // Untouched sections keep defaults
        assert_eq!(config.router.limits.max_peers(), 1024);
        assert!(config.router.limits.max_peers.is_none());
    }

    #[test]
    fn test_load_from_paths_merges_in_priority_order() {
        let dir = TempDir::new().unwrap();
        let low = dir.path().join("low.yaml");
        let high = dir.path().join("high.yaml");

        fs::write(&low, "router:\n  limits:\n    max_peers: 10\n").unwrap();
        fs::write(
            &high,
            "router:\n  limits:\n    max_peers: 20\n  delivery:\n    mandatory: true\n",
        )
        .unwrap();

        let (config, loaded) =
            Config::load_from_paths(&[low.clone(), high.clone()]).unwrap();
        assert_eq!(loaded, vec![low, high]);
        assert_eq!(config.router.limits.max_peers(), 20);
        assert!(config.router.delivery.mandatory());
    }

    #[test]
    fn test_explicit_default_value_overrides_lower_priority() {
        let dir = TempDir::new().unwrap();
        let low = dir.path().join("low.yaml");
        let high = dir.path().join("high.yaml");

        fs::write(
            &low,
            "router:\n  delivery:\n    mandatory: true\n  limits:\n    max_peers: 64\n",
        )
        .unwrap();
        // High-priority file explicitly sets values equal to the
        // built-in defaults; they must still win.
        fs::write(
            &high,
            "router:\n  delivery:\n    mandatory: false\n  limits:\n    max_peers: 1024\n",
        )
        .unwrap();

        let (config, _) = Config::load_from_paths(&[low, high]).unwrap();
        assert!(!config.router.delivery.mandatory());
        assert_eq!(config.router.limits.max_peers(), 1024);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut base: Config =
            serde_yaml::from_str("router:\n  limits:\n    max_peers: 64\n").unwrap();
        let overlay: Config =
            serde_yaml::from_str("router:\n  delivery:\n    mandatory: true\n").unwrap();

        base.merge(overlay);
        assert_eq!(base.router.limits.max_peers(), 64);
        assert!(base.router.delivery.mandatory());
    }

    #[test]
    fn test_load_from_paths_skips_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        let (config, loaded) = Config::load_from_paths(&[missing]).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(config.router.limits.max_peers(), 1024);
    }

    #[test]
    fn test_load_file_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "router: [not-a-map").unwrap();

        let err = Config::load_file(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }

    #[test]
    fn test_search_paths_includes_expected() {
        let paths = Config::search_paths();
        assert!(paths
            .first()
            .unwrap()
            .starts_with("/etc/fanin"));
        assert!(paths
            .last()
            .unwrap()
            .ends_with("fanin.yaml"));
    }

    #[test]
    fn test_to_yaml_round_trip() {
        let mut config = Config::new();
        config.router.delivery.mandatory = Some(true);
        let yaml = config.to_yaml().unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(back.router.delivery.mandatory());
    }
}
