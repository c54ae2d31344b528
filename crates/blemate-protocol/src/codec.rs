//! Line-based codec for module communication.
//!
//! The BC118 terminates every line it sends with `\n\r` (in that order) and
//! expects commands terminated with a single carriage return (`\r`). Lines
//! arrive one byte at a time over a slow UART, so the codec is fed byte by
//! byte and hands back a line as soon as the end-of-line marker is a suffix
//! of the accumulated buffer.

use bytes::BytesMut;

use crate::constants::{COMMAND_TERMINATOR, EOL};

/// Initial capacity of the line buffer. Lines longer than this still work,
/// the buffer just grows.
pub const LINE_CAPACITY: usize = 80;

/// A codec for reading and writing module lines.
///
/// This handles the line-based nature of the protocol:
/// - Accumulates received bytes until the `\n\r` marker is seen
/// - Clears the buffer as soon as a completed line is handed out, so a
///   partial line is never mistaken for a complete one
#[derive(Debug)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(LINE_CAPACITY),
        }
    }

    /// Add one received byte to the buffer.
    ///
    /// Returns `Some(line)` when this byte completed a line. The returned text
    /// has the end-of-line marker stripped; the buffer is empty afterwards.
    pub fn push_byte(&mut self, byte: u8) -> Option<String> {
        self.buffer.extend_from_slice(&[byte]);

        if !self.buffer.ends_with(EOL) {
            return None;
        }

        let line_data = self.buffer.split();
        let body = &line_data[..line_data.len() - EOL.len()];
        let line = String::from_utf8_lossy(body).into_owned();
        log::trace!("line complete: {:?}", line);
        Some(line)
    }

    /// Add several received bytes, returning every line they completed.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        data.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Encode a command for transmission.
    ///
    /// Appends the carriage return terminator.
    pub fn encode_command(cmd: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(cmd.len() + 1);
        buf.extend_from_slice(cmd);
        buf.push(COMMAND_TERMINATOR);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a partial line is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard any partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        let encoded = LineCodec::encode_command(b"GET CENT");
        assert_eq!(encoded, b"GET CENT\r");
    }

    #[test]
    fn test_decode_line() {
        let mut codec = LineCodec::new();
        let lines = codec.push(b"OK\n\r");
        assert_eq!(lines, vec!["OK".to_string()]);
        assert!(codec.is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut codec = LineCodec::new();
        assert!(codec.push(b"Bluetooth Add").is_empty());
        assert_eq!(codec.buffered_len(), 13);

        let lines = codec.push(b"ress 0123456789AB\n\r");
        assert_eq!(lines, vec!["Bluetooth Address 0123456789AB".to_string()]);
    }

    #[test]
    fn test_reversed_marker_is_not_a_line_end() {
        // `\r\n` is not the module's end-of-line marker.
        let mut codec = LineCodec::new();
        assert!(codec.push(b"OK\r\n").is_empty());
        assert_eq!(codec.buffer_as_str(), "OK\r\n");

        // ...but the `\n` plus a following `\r` completes a line.
        let lines = codec.push(b"\r");
        assert_eq!(lines, vec!["OK\r".to_string()]);
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut codec = LineCodec::new();
        let lines = codec.push(b"STS=C\n\rOK\n\rER");
        assert_eq!(lines, vec!["STS=C".to_string(), "OK".to_string()]);
        assert_eq!(codec.buffer_as_str(), "ER");
    }

    #[test]
    fn test_empty_line() {
        let mut codec = LineCodec::new();
        assert_eq!(codec.push_byte(b'\n'), None);
        assert_eq!(codec.push_byte(b'\r'), Some(String::new()));
    }

    #[test]
    fn test_clear_drops_partial_line() {
        let mut codec = LineCodec::new();
        codec.push(b"SCN=P 0123");
        codec.clear();
        assert_eq!(codec.push(b"OK\n\r"), vec!["OK".to_string()]);
    }
}
