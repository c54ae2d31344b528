//! Outcomes and errors reported by driver operations.

use blemate_protocol::ProtocolError;
use serde::Serialize;
use thiserror::Error;

/// Final result of one module operation.
///
/// Every operation ends in exactly one of these. Driver methods return
/// [`DriverResult`]; [`Outcome::of`] folds such a result back into this
/// closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The module confirmed the operation.
    Success,
    /// The deadline passed without a terminal line.
    Timeout,
    /// The module answered with its error sentinel.
    ModuleError,
    /// Nothing answered on the radio side (notably: a scan found nothing).
    RemoteError,
    /// An argument was rejected before any I/O.
    InvalidParameter,
    /// Reserved for connection failures.
    ConnectError,
    /// Anything else, including transport failures.
    DefaultError,
}

impl Outcome {
    /// Snake-case name, as used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Timeout => "timeout",
            Outcome::ModuleError => "module_error",
            Outcome::RemoteError => "remote_error",
            Outcome::InvalidParameter => "invalid_parameter",
            Outcome::ConnectError => "connect_error",
            Outcome::DefaultError => "default_error",
        }
    }

    /// Whether this is [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// The outcome of a driver call.
    pub fn of<T>(result: &DriverResult<T>) -> Outcome {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => e.outcome(),
        }
    }

    /// Turn the outcome into a result, so callers can use `?`.
    pub fn into_result(self) -> DriverResult<()> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::Timeout => Err(DriverError::Timeout),
            Outcome::ModuleError => Err(DriverError::Module),
            Outcome::RemoteError => Err(DriverError::Remote),
            Outcome::InvalidParameter => {
                Err(DriverError::InvalidParameter("rejected by driver".to_string()))
            }
            Outcome::ConnectError => Err(DriverError::Connect),
            Outcome::DefaultError => Err(DriverError::Default),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The deadline passed without a terminal line.
    #[error("timed out waiting for the module")]
    Timeout,

    /// The module answered with its error sentinel.
    #[error("module reported an error")]
    Module,

    /// No remote device answered.
    #[error("no remote device found")]
    Remote,

    /// An argument was rejected before any I/O.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The connection could not be established.
    #[error("connection failed")]
    Connect,

    /// Unclassified failure.
    #[error("operation failed")]
    Default,

    /// The transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Map the error onto the closed [`Outcome`] set.
    pub fn outcome(&self) -> Outcome {
        match self {
            DriverError::Timeout => Outcome::Timeout,
            DriverError::Module => Outcome::ModuleError,
            DriverError::Remote => Outcome::RemoteError,
            DriverError::InvalidParameter(_) => Outcome::InvalidParameter,
            DriverError::Connect => Outcome::ConnectError,
            DriverError::Default | DriverError::Io(_) => Outcome::DefaultError,
        }
    }
}

impl From<ProtocolError> for DriverError {
    fn from(err: ProtocolError) -> Self {
        DriverError::InvalidParameter(err.to_string())
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
