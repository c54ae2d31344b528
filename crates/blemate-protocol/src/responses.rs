//! Response classification for the module protocol.
//!
//! The module sends plain text lines and which of them matter depends on the
//! command that triggered them: `SCNT=5` is a value when it answers
//! `GET SCNT`, while during a scan the same `SC` prefix marks a discovered
//! device. Each command therefore carries a [`ResponseRule`] and lines are
//! classified against it.

use std::fmt;

use crate::constants::*;

/// Which response lines a command is interested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseRule {
    /// Plain command: only `OK` and `ER` matter.
    Standard,
    /// `GET <key>`: capture the `<key>=<value>` line before `OK`.
    GetParam {
        /// Parameter name as sent in the command.
        key: String,
    },
    /// `VER`: capture the `Bluetooth Address` line before `OK`.
    Identity,
    /// `SCN ON`: capture every scan report; the module never says `OK`.
    Scan,
    /// `RST`: wait for the `READY` banner.
    Reset,
    /// `CON`: wait for the connection acknowledgement.
    Connect,
    /// `DCN`: wait for the disconnection acknowledgement.
    Disconnect,
    /// `STS`: capture the status line before `OK`.
    Status,
}

/// Operating role of the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Initiates connections.
    Central,
    /// Advertises and accepts connections.
    Peripheral,
}

impl Role {
    /// Largest payload a single `SND` frame may carry in this role.
    pub fn frame_limit(&self) -> usize {
        match self {
            Role::Central => CENTRAL_FRAME_LIMIT,
            Role::Peripheral => PERIPHERAL_FRAME_LIMIT,
        }
    }

    /// Lowercase name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Central => "central",
            Role::Peripheral => "peripheral",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response line, classified against the rule of the command in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Success sentinel.
    Ok,

    /// Error sentinel, with the full line.
    Error(String),

    /// Value of the requested parameter (from `GET`), whitespace trimmed.
    Value(String),

    /// Module address from the version banner.
    Identity {
        /// The 12-character address.
        address: String,
    },

    /// A device seen while scanning.
    ScanReport {
        /// The 12-character address.
        address: String,
    },

    /// The module finished resetting.
    Ready,

    /// Connection established.
    Connected,

    /// Connection dropped.
    Disconnected,

    /// Status line.
    Status {
        /// Role reported by the module.
        role: Role,
    },

    /// Anything the current command does not care about (banners, echoes,
    /// unrelated notifications).
    Noise(String),
}

impl Response {
    /// Classify one completed line (end-of-line marker already stripped).
    ///
    /// The error sentinel is checked first for every rule, so an error line
    /// always wins over any other interpretation.
    pub fn classify(line: &str, rule: &ResponseRule) -> Response {
        if line.starts_with(PREFIX_ERROR) {
            return Response::Error(line.to_string());
        }

        let response = match rule {
            ResponseRule::Standard => Self::ok_or_noise(line),
            ResponseRule::GetParam { key } => {
                if line.starts_with(PREFIX_OK) {
                    Response::Ok
                } else if line.starts_with(key.as_str()) {
                    // Skip the key and the `=` that follows it.
                    let value = line.get(key.len() + 1..).unwrap_or("");
                    Response::Value(value.trim().to_string())
                } else {
                    Response::Noise(line.to_string())
                }
            }
            ResponseRule::Identity => {
                if line.starts_with(PREFIX_IDENTITY) {
                    let (start, end) = IDENTITY_ADDRESS_RANGE;
                    Response::Identity {
                        address: char_window(line, start, end),
                    }
                } else {
                    Self::ok_or_noise(line)
                }
            }
            ResponseRule::Scan => {
                if line.starts_with(PREFIX_SCAN) {
                    let (start, end) = SCAN_ADDRESS_RANGE;
                    Response::ScanReport {
                        address: char_window(line, start, end),
                    }
                } else {
                    Response::Noise(line.to_string())
                }
            }
            ResponseRule::Reset => {
                if line.starts_with(PREFIX_READY) {
                    Response::Ready
                } else {
                    Response::Noise(line.to_string())
                }
            }
            ResponseRule::Connect => {
                if line.starts_with(PREFIX_CONNECTED) {
                    Response::Connected
                } else {
                    Response::Noise(line.to_string())
                }
            }
            ResponseRule::Disconnect => {
                if line.starts_with(PREFIX_DISCONNECTED) {
                    Response::Disconnected
                } else {
                    Response::Noise(line.to_string())
                }
            }
            ResponseRule::Status => {
                if line.starts_with(PREFIX_STATUS) {
                    let role = match line.as_bytes().get(STATUS_ROLE_OFFSET) {
                        Some(&STATUS_CENTRAL_FLAG) => Role::Central,
                        _ => Role::Peripheral,
                    };
                    Response::Status { role }
                } else {
                    Self::ok_or_noise(line)
                }
            }
        };

        log::debug!("classified {:?} under {:?} as {:?}", line, rule, response);
        response
    }

    fn ok_or_noise(line: &str) -> Response {
        if line.starts_with(PREFIX_OK) {
            Response::Ok
        } else {
            Response::Noise(line.to_string())
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Check if this line should simply be dropped.
    pub fn is_noise(&self) -> bool {
        matches!(self, Response::Noise(_))
    }
}

/// Characters `start..end` of `line`, clamped to the line length.
fn char_window(line: &str, start: usize, end: usize) -> String {
    line.chars().skip(start).take(end.saturating_sub(start)).collect()
}
