//! Protocol constants
//!
//! Line markers, response prefixes and fixed field positions used by the
//! BC118 UART protocol.

// ============================================================================
// Framing
// ============================================================================

/// Terminator appended to every command sent to the module.
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// End-of-line marker closing every line the module sends.
///
/// Note the order: the module sends `\n` first, then `\r`.
pub const EOL: &[u8] = b"\n\r";

// ============================================================================
// Response Prefixes (module → host)
// ============================================================================

/// Success sentinel.
pub const PREFIX_OK: &str = "OK";
/// Error sentinel (`ERR` on the wire; two characters are enough to match).
pub const PREFIX_ERROR: &str = "ER";
/// Address-bearing line of the `VER` response (`Bluetooth Address xxxxxxxxxxxx`).
pub const PREFIX_IDENTITY: &str = "Bluet";
/// Scan report (`SCN=X xxxxxxxxxxxx ...`).
pub const PREFIX_SCAN: &str = "SC";
/// Module came out of reset (`READY`).
pub const PREFIX_READY: &str = "RE";
/// Connection established with the remote peer.
pub const PREFIX_CONNECTED: &str = "RPD";
/// Link dropped.
pub const PREFIX_DISCONNECTED: &str = "DCN";
/// Status line returned by `STS`.
pub const PREFIX_STATUS: &str = "STS";

// ============================================================================
// Field Positions
// ============================================================================

/// Length of a hardware address: 12 uppercase hex digits.
pub const ADDRESS_LEN: usize = 12;

/// Character window holding the address in a `Bluetooth Address` line.
pub const IDENTITY_ADDRESS_RANGE: (usize, usize) = (18, 18 + ADDRESS_LEN);

/// Character window holding the address in a scan report.
pub const SCAN_ADDRESS_RANGE: (usize, usize) = (6, 6 + ADDRESS_LEN);

/// Offset of the role flag in a status line (`C` = central).
pub const STATUS_ROLE_OFFSET: usize = 4;

/// Role flag value for central mode.
pub const STATUS_CENTRAL_FLAG: u8 = b'C';

// ============================================================================
// Link Limits
// ============================================================================

/// Largest `SND` payload the module accepts in central mode.
pub const CENTRAL_FRAME_LIMIT: usize = 20;

/// Largest `SND` payload the module accepts in peripheral mode.
pub const PERIPHERAL_FRAME_LIMIT: usize = 125;

/// Maximum number of distinct addresses kept from a scan.
pub const MAX_SCAN_ADDRESSES: usize = 5;
