//! Splitting outgoing payloads into `SND` frames.

use blemate_metrics::metric_defs;
use blemate_protocol::{Command, ResponseRule, Role};
use tracing::debug;

use crate::channel::Channel;
use crate::clock::Clock;
use crate::driver::BleMate;
use crate::error::DriverResult;

/// Consecutive frames of `payload` no longer than the limit for `role`.
pub fn frames(payload: &[u8], role: Role) -> std::slice::Chunks<'_, u8> {
    payload.chunks(role.frame_limit())
}

impl<C: Channel, K: Clock> BleMate<C, K> {
    /// Send text over the current connection.
    pub fn send_str(&mut self, text: &str) -> DriverResult<()> {
        self.send_data(text.as_bytes())
    }

    /// Send raw bytes over the current connection.
    ///
    /// The role is queried first, since it decides the frame size. Frames go
    /// out one `SND` command at a time and the first failure ends the send.
    /// An empty payload sends nothing.
    pub fn send_data(&mut self, payload: &[u8]) -> DriverResult<()> {
        if payload.is_empty() {
            return Ok(());
        }

        let role = self.role()?;
        debug!(
            "sending {} bytes as {} in frames of {}",
            payload.len(),
            role,
            role.frame_limit()
        );

        for frame in frames(payload, role) {
            let command = Command::SendData {
                data: frame.to_vec(),
            };
            self.run(&command, self.config.command_timeout(), ResponseRule::Standard)?
                .outcome
                .into_result()?;

            metrics::counter!(metric_defs::DATA_FRAMES_SENT.name, &self.labels.to_labels())
                .increment(1);
            metrics::counter!(metric_defs::DATA_BYTES_SENT.name, &self.labels.to_labels())
                .increment(frame.len() as u64);
        }
        Ok(())
    }
}
