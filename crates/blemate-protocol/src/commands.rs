//! Commands that can be sent to the module.
//!
//! The module supports several categories of commands:
//! - Configuration get/set commands
//! - Action commands (reset, scan, connect, etc.)
//! - Query commands (version, status)
//! - Data transmission (`SND`)

use std::fmt;
use std::str::FromStr;

use crate::codec::LineCodec;
use crate::constants::{ADDRESS_LEN, COMMAND_TERMINATOR};
use crate::error::{ProtocolError, ProtocolResult};

/// Configuration keys that can be read/written via `GET`/`SET` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Central mode on/off (`CENT`)
    Central,
    /// Scan duration in seconds (`SCNT`)
    ScanTimeout,
    /// UART speed register (`UART`)
    Uart,
}

impl ConfigKey {
    /// Get the config key string used in commands.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Central => "CENT",
            ConfigKey::ScanTimeout => "SCNT",
            ConfigKey::Uart => "UART",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CENT" => Ok(ConfigKey::Central),
            "SCNT" => Ok(ConfigKey::ScanTimeout),
            "UART" => Ok(ConfigKey::Uart),
            _ => Err(ProtocolError::UnknownConfigKey(s.to_string())),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UART speeds the module can be switched to.
///
/// The module does not take a human readable rate; each speed maps to a
/// 16-bit register value written as four hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    /// 2400 bps
    B2400,
    /// 9600 bps
    B9600,
    /// 19200 bps
    B19200,
    /// 38400 bps
    B38400,
    /// 57600 bps
    B57600,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 5] = [
        BaudRate::B2400,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
    ];

    /// The rate in bits per second.
    pub fn bps(&self) -> u32 {
        match self {
            BaudRate::B2400 => 2400,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
        }
    }

    /// The `UART` register value for this rate.
    pub fn code(&self) -> &'static str {
        match self {
            BaudRate::B2400 => "000A",
            BaudRate::B9600 => "0028",
            BaudRate::B19200 => "004E",
            BaudRate::B38400 => "009E",
            BaudRate::B57600 => "00EB",
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ProtocolError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|rate| rate.bps() == bps)
            .ok_or(ProtocolError::UnsupportedBaudRate(bps))
    }
}

/// Check that a device address has the expected shape.
///
/// Only the length is checked; the module rejects anything else itself.
pub fn validate_address(address: &str) -> ProtocolResult<()> {
    let actual = address.chars().count();
    if actual != ADDRESS_LEN {
        return Err(ProtocolError::InvalidAddress {
            address: address.to_string(),
            expected: ADDRESS_LEN,
            actual,
        });
    }
    Ok(())
}

/// Commands that can be sent to the module.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ========== Housekeeping ==========
    /// Empty line, used to flush a partial command out of the module.
    Resync,

    /// Reset the module (`RST`).
    Reset,

    /// Restore factory defaults (`RTR`).
    Restore,

    /// Persist the current settings to non-volatile memory (`WRT`).
    WriteConfig,

    // ========== Configuration ==========
    /// Get a configuration value.
    GetConfig {
        /// The configuration key to get.
        key: ConfigKey,
    },

    /// Get a configuration value by raw string key.
    GetConfigRaw {
        /// The configuration key string.
        key: String,
    },

    /// Set a configuration value.
    SetConfig {
        /// The configuration key to set.
        key: ConfigKey,
        /// The value to set.
        value: String,
    },

    /// Set a configuration value by raw string key.
    SetConfigRaw {
        /// The configuration key string.
        key: String,
        /// The value to set.
        value: String,
    },

    // ========== Queries ==========
    /// Firmware version banner, which includes the module address (`VER`).
    Version,

    /// Link status, which includes the central/peripheral flag (`STS`).
    Status,

    // ========== Radio ==========
    /// Enter scan state (`SCN ON`).
    ScanOn,

    /// Leave scan state (`SCN OFF`).
    ScanOff,

    /// Turn advertising on or off (`ADV ON` / `ADV OFF`).
    Advertise {
        /// Whether advertising should be enabled.
        enabled: bool,
    },

    /// Connect to a remote device.
    ///
    /// The module only accepts `CON` while scanning, so this encodes as
    /// `SCN ON` followed by `CON <address> 0`.
    Connect {
        /// 12-digit hex address of the remote device.
        address: String,
    },

    /// Drop the current connection (`DCN`).
    Disconnect,

    /// Send one frame of data over the link (`SND <data>`).
    SendData {
        /// Raw frame contents.
        data: Vec<u8>,
    },

    // ========== Raw Command ==========
    /// Send a raw command string.
    Raw {
        /// The raw command text.
        command: String,
    },
}

impl Command {
    /// Encode the command as bytes to send to the module.
    /// Returns the bytes to send (including the `\r` terminator).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Connect { address } => {
                let mut buf = LineCodec::encode_command(b"SCN ON");
                buf.extend(LineCodec::encode_command(format!("CON {} 0", address).as_bytes()));
                buf
            }
            Command::SendData { data } => {
                let mut buf = Vec::with_capacity(data.len() + 5);
                buf.extend_from_slice(b"SND ");
                buf.extend_from_slice(data);
                buf.push(COMMAND_TERMINATOR);
                buf
            }
            _ => LineCodec::encode_command(self.to_command_string().as_bytes()),
        }
    }

    /// Get the command string without the terminator.
    ///
    /// For commands that span several lines the lines are joined with `\r`.
    /// Frame data is rendered lossily, since it need not be text.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::Resync => String::new(),
            Command::Reset => "RST".to_string(),
            Command::Restore => "RTR".to_string(),
            Command::WriteConfig => "WRT".to_string(),

            Command::GetConfig { key } => format!("GET {}", key.as_str()),
            Command::GetConfigRaw { key } => format!("GET {}", key),
            Command::SetConfig { key, value } => format!("SET {}={}", key.as_str(), value),
            Command::SetConfigRaw { key, value } => format!("SET {}={}", key, value),

            Command::Version => "VER".to_string(),
            Command::Status => "STS".to_string(),

            Command::ScanOn => "SCN ON".to_string(),
            Command::ScanOff => "SCN OFF".to_string(),
            Command::Advertise { enabled: true } => "ADV ON".to_string(),
            Command::Advertise { enabled: false } => "ADV OFF".to_string(),
            Command::Connect { address } => format!("SCN ON\rCON {} 0", address),
            Command::Disconnect => "DCN".to_string(),
            Command::SendData { data } => format!("SND {}", String::from_utf8_lossy(data)),

            Command::Raw { command } => command.clone(),
        }
    }

    /// Short, stable name of the command, used for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Resync => "resync",
            Command::Reset => "reset",
            Command::Restore => "restore",
            Command::WriteConfig => "write_config",
            Command::GetConfig { .. } | Command::GetConfigRaw { .. } => "get",
            Command::SetConfig { .. } | Command::SetConfigRaw { .. } => "set",
            Command::Version => "version",
            Command::Status => "status",
            Command::ScanOn => "scan_on",
            Command::ScanOff => "scan_off",
            Command::Advertise { .. } => "advertise",
            Command::Connect { .. } => "connect",
            Command::Disconnect => "disconnect",
            Command::SendData { .. } => "send_data",
            Command::Raw { .. } => "raw",
        }
    }
}
