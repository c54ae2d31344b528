//! Error types for the BLE Mate protocol.

use thiserror::Error;

/// Errors that can occur when building commands for the module.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The requested UART speed has no register encoding.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// A device address was not exactly 12 characters long.
    #[error("invalid device address {address:?}: expected {expected} characters, got {actual}")]
    InvalidAddress {
        /// The rejected address.
        address: String,
        /// Required length.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Unknown configuration parameter name.
    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
