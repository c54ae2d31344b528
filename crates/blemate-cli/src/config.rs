//! `blemate` configuration file.
//!
//! ```yaml
//! tcp: 127.0.0.1:5000      # or: serial: /dev/ttyUSB0
//! baud: 9600
//! driver:
//!   reset_timeout_ms: 8000
//! ```

use std::path::Path;

use blemate_driver::{ConfigError, DriverConfig};
use serde::{Deserialize, Serialize};

/// Default UART speed of a factory-fresh module.
pub const DEFAULT_BAUD: u32 = 9600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// UART bridge to connect to, as `host:port`.
    pub tcp: Option<String>,
    /// Serial device path.
    pub serial: Option<String>,
    /// Serial speed.
    pub baud: u32,
    /// Driver timings.
    pub driver: DriverConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            tcp: None,
            serial: None,
            baud: DEFAULT_BAUD,
            driver: DriverConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = CliConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_nested_driver_section() {
        let yaml = "serial: /dev/ttyUSB0\nbaud: 57600\ndriver:\n  reset_timeout_ms: 8000\n";
        let config = CliConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.serial.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.tcp, None);
        assert_eq!(config.baud, 57600);
        assert_eq!(config.driver.reset_timeout_ms, 8000);
        assert_eq!(config.driver.connect_timeout_ms, 5000);
    }
}
