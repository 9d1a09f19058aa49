//! # Configuration
//!
//! YAML configuration for hosts running the estimator.
//!
//! ## Search Path
//!
//! The first file found wins:
//! 1. Path in the `DOA_CONFIG` environment variable
//! 2. `./doa.yaml`
//! 3. the per-user config directory (e.g. `~/.config/doa/config.yaml`)
//! 4. `/etc/doa/config.yaml`
//!
//! Defaults are used when none exists.
//!
//! ## Example Configuration
//!
//! ```yaml
//! scan:
//!   angle_count: 1800
//!
//! frames:
//!   header_layout: compact
//!   max_antennas: 16
//!
//! transport:
//!   udp:
//!     bind: "0.0.0.0:5555"
//!
//! logging:
//!   level: debug
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::accumulator::MIN_ANTENNAS;
use crate::frame::HeaderLayout;
use crate::observe::LogConfig;
use crate::steering::ANGLES_COARSE;
use crate::transport::UdpSourceConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOA_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NotFound(String),
    ReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Angular scan grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Points between −90° and +90° inclusive
    pub angle_count: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            angle_count: ANGLES_COARSE,
        }
    }
}

/// Wire-format and accumulation limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub header_layout: HeaderLayout,
    /// Frames with more channels are dropped
    pub max_antennas: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            header_layout: HeaderLayout::Batched,
            max_antennas: 64,
        }
    }
}

/// Eigensolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubspaceConfig {
    /// Schur iteration cap (0 = unbounded)
    pub max_iterations: usize,
    /// Convergence threshold
    pub tolerance: f64,
}

impl Default for SubspaceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: f64::EPSILON,
        }
    }
}

/// Refresh cadence hint for the host's timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
    /// Messages pulled from the source per ingest
    pub drain_limit: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            drain_limit: crate::transport::DEFAULT_DRAIN_LIMIT,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub udp: UdpSourceConfig,
}

/// Complete estimator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoaConfig {
    pub scan: ScanConfig,
    pub frames: FrameConfig,
    pub subspace: SubspaceConfig,
    pub refresh: RefreshConfig,
    pub transport: TransportConfig,
    pub logging: LogConfig,
}

impl DoaConfig {
    /// Load from the default search path, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points to {}",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML. Missing sections take their defaults.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Candidate files, in priority order (the env var is checked separately).
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./doa.yaml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "doa") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/doa/config.yaml"));
        paths
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.angle_count < 2 {
            return Err(ConfigError::ValidationError(
                "scan.angle_count must be >= 2".to_string(),
            ));
        }
        if self.frames.max_antennas < MIN_ANTENNAS {
            return Err(ConfigError::ValidationError(format!(
                "frames.max_antennas must be >= {}",
                MIN_ANTENNAS
            )));
        }
        if !(self.subspace.tolerance > 0.0 && self.subspace.tolerance.is_finite()) {
            return Err(ConfigError::ValidationError(
                "subspace.tolerance must be a positive finite number".to_string(),
            ));
        }
        if self.refresh.drain_limit == 0 {
            return Err(ConfigError::ValidationError(
                "refresh.drain_limit must be > 0".to_string(),
            ));
        }
        if self.transport.udp.recv_buf_size == 0 {
            return Err(ConfigError::ValidationError(
                "transport.udp.recv_buf_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Default configuration rendered as YAML.
    pub fn example_yaml() -> String {
        serde_yaml::to_string(&Self::default()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::LogLevel;

    #[test]
    fn test_default_config() {
        let config = DoaConfig::default();
        assert_eq!(config.scan.angle_count, 180);
        assert_eq!(config.frames.header_layout, HeaderLayout::Batched);
        assert_eq!(config.frames.max_antennas, 64);
        assert_eq!(config.refresh.interval_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
scan:
  angle_count: 1800
frames:
  header_layout: compact
  max_antennas: 8
subspace:
  max_iterations: 500
transport:
  udp:
    bind: "127.0.0.1:6000"
logging:
  level: debug
"#;
        let config = DoaConfig::parse(yaml).unwrap();
        assert_eq!(config.scan.angle_count, 1800);
        assert_eq!(config.frames.header_layout, HeaderLayout::Compact);
        assert_eq!(config.frames.max_antennas, 8);
        assert_eq!(config.subspace.max_iterations, 500);
        assert_eq!(config.subspace.tolerance, f64::EPSILON);
        assert_eq!(config.transport.udp.bind, "127.0.0.1:6000");
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = DoaConfig::parse("refresh:\n  interval_ms: 100\n").unwrap();
        assert_eq!(config.refresh.interval_ms, 100);
        assert_eq!(config.scan.angle_count, 180);
        assert_eq!(config.frames.max_antennas, 64);
    }

    #[test]
    fn test_parse_error() {
        let err = DoaConfig::parse("frames:\n  header_layout: sideways\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = DoaConfig::default();
        config.scan.angle_count = 1;
        assert!(config.validate().is_err());

        config = DoaConfig::default();
        config.frames.max_antennas = 1;
        assert!(config.validate().is_err());

        config = DoaConfig::default();
        config.subspace.tolerance = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_yaml_round_trip() {
        let yaml = DoaConfig::example_yaml();
        assert!(yaml.contains("scan:"));
        assert!(yaml.contains("header_layout: batched"));
        assert_eq!(DoaConfig::parse(&yaml).unwrap(), DoaConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("doa-config-{}.yaml", std::process::id()));
        let mut config = DoaConfig::default();
        config.scan.angle_count = 361;
        config.save(&path).unwrap();

        let loaded = DoaConfig::load_from(&path).unwrap();
        assert_eq!(loaded.scan.angle_count, 361);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_search_paths() {
        let paths = DoaConfig::config_search_paths();
        assert!(paths[0].ends_with("doa.yaml"));
        assert!(paths.last().unwrap().starts_with("/etc/doa"));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::ValidationError("bad".into());
        assert_eq!(err.to_string(), "invalid config: bad");
    }
}
