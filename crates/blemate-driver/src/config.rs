//! Driver timing configuration.
//!
//! Defaults match the module's documented response times. Every field can be
//! overridden from YAML; missing fields keep their default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for this structure.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Deadlines and delays used by the driver, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// How long the resync exchange may stay silent before giving up.
    pub resync_idle_ms: u64,
    /// Plain commands (`RTR`, `WRT`, `ADV`, `SND`, ...).
    pub command_timeout_ms: u64,
    /// `GET` and `SET`.
    pub param_timeout_ms: u64,
    /// `VER`.
    pub version_timeout_ms: u64,
    /// `STS`.
    pub status_timeout_ms: u64,
    /// `RST`, until the `READY` banner.
    pub reset_timeout_ms: u64,
    /// Pause after reset for scan noise to die down.
    pub reset_settle_ms: u64,
    /// `CON`, until the connection acknowledgement.
    pub connect_timeout_ms: u64,
    /// `DCN`, until the disconnection acknowledgement.
    pub disconnect_timeout_ms: u64,
    /// Scan deadline per unit of the caller's scan timeout. Slightly longer
    /// than the module's own second so the module finishes first.
    pub scan_ms_per_unit: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            resync_idle_ms: 1000,
            command_timeout_ms: 3000,
            param_timeout_ms: 2000,
            version_timeout_ms: 2000,
            status_timeout_ms: 3000,
            reset_timeout_ms: 6000,
            reset_settle_ms: 500,
            connect_timeout_ms: 5000,
            disconnect_timeout_ms: 5000,
            scan_ms_per_unit: 1300,
        }
    }
}

impl DriverConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Silence after which a resync gives up.
    pub fn resync_idle(&self) -> Duration {
        Duration::from_millis(self.resync_idle_ms)
    }

    /// Deadline for plain commands.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Deadline for `SET` and `GET`.
    pub fn param_timeout(&self) -> Duration {
        Duration::from_millis(self.param_timeout_ms)
    }

    /// Deadline for `VER`.
    pub fn version_timeout(&self) -> Duration {
        Duration::from_millis(self.version_timeout_ms)
    }

    /// Deadline for `STS`.
    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    /// Deadline for the ready banner after `RST`.
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Pause after reset before buffered input is dropped.
    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    /// Deadline for a connection to be reported.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Deadline for `DCN`.
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms)
    }

    /// Deadline for a scan the module was told to run for `units` seconds.
    pub fn scan_timeout(&self, units: u32) -> Duration {
        Duration::from_millis(u64::from(units) * self.scan_ms_per_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.resync_idle(), Duration::from_secs(1));
        assert_eq!(config.reset_timeout(), Duration::from_secs(6));
        assert_eq!(config.scan_timeout(5), Duration::from_millis(6500));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = DriverConfig::from_yaml_str("reset_timeout_ms: 8000\nscan_ms_per_unit: 1000\n")
            .unwrap();
        assert_eq!(config.reset_timeout_ms, 8000);
        assert_eq!(config.scan_timeout(3), Duration::from_secs(3));
        assert_eq!(config.command_timeout_ms, 3000);
    }

    #[test]
    fn test_bad_yaml() {
        let err = DriverConfig::from_yaml_str("reset_timeout_ms: soon").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = DriverConfig::from_file("/nonexistent/blemate.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
