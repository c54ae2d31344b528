//! In-memory stand-ins for the module and the clock.
//!
//! [`ScriptedModule`] answers commands from a script the way a module on the
//! other end of a UART would, and [`ManualClock`] moves time forward a fixed
//! tick per reading, so deadline-driven loops terminate without sleeping.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use blemate_protocol::COMMAND_TERMINATOR;

use crate::channel::Channel;
use crate::clock::Clock;

/// Default clock advance per [`ManualClock::now`] call.
const DEFAULT_TICK: Duration = Duration::from_millis(1);

/// A clock that only moves when read or told to.
///
/// Each call to [`Clock::now`] returns the current reading and then advances
/// by the tick; [`Clock::sleep`] advances by the requested duration.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Duration>,
    tick: Duration,
}

impl ManualClock {
    /// A clock that advances 1 ms per reading.
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    /// A clock that advances `tick` per reading.
    pub fn with_tick(tick: Duration) -> Self {
        ManualClock {
            now: Cell::new(Duration::ZERO),
            tick,
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Current reading, without advancing.
    pub fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.tick);
        now
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// A fake module driven by a script of expected commands and replies.
///
/// Written bytes are split on `\r`. An empty line is a resync and is answered
/// with the resync reply (`ERR\n\r` unless changed). Any other line is
/// recorded; when it matches the next scripted command, that entry's reply is
/// queued for reading. Unmatched commands get no answer.
#[derive(Debug)]
pub struct ScriptedModule {
    rx: VecDeque<u8>,
    written: Vec<u8>,
    partial: Vec<u8>,
    commands: Vec<Vec<u8>>,
    script: VecDeque<(Vec<u8>, Vec<u8>)>,
    resync_reply: Option<Vec<u8>>,
    resyncs: usize,
}

impl ScriptedModule {
    pub fn new() -> Self {
        ScriptedModule {
            rx: VecDeque::new(),
            written: Vec::new(),
            partial: Vec::new(),
            commands: Vec::new(),
            script: VecDeque::new(),
            resync_reply: Some(b"ERR\n\r".to_vec()),
            resyncs: 0,
        }
    }

    /// Answer the next occurrence of `command` (without terminator) with `reply`.
    pub fn expect(mut self, command: impl AsRef<[u8]>, reply: impl AsRef<[u8]>) -> Self {
        self.script
            .push_back((command.as_ref().to_vec(), reply.as_ref().to_vec()));
        self
    }

    /// Answer resyncs with `reply` instead of `ERR`.
    pub fn resync_reply(mut self, reply: impl AsRef<[u8]>) -> Self {
        self.resync_reply = Some(reply.as_ref().to_vec());
        self
    }

    /// Never answer resyncs.
    pub fn silent_resync(mut self) -> Self {
        self.resync_reply = None;
        self
    }

    /// Queue bytes as if the module sent them unprompted.
    pub fn inject(&mut self, bytes: impl AsRef<[u8]>) {
        self.rx.extend(bytes.as_ref());
    }

    /// Every byte written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Non-empty command lines received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }

    /// Non-empty command lines received, as raw bytes.
    pub fn command_bytes(&self) -> &[Vec<u8>] {
        &self.commands
    }

    /// Number of resync lines received.
    pub fn resync_count(&self) -> usize {
        self.resyncs
    }

    /// Scripted commands not yet received.
    pub fn pending_replies(&self) -> usize {
        self.script.len()
    }

    /// Bytes queued for the host but not yet read.
    pub fn unread(&self) -> usize {
        self.rx.len()
    }

    fn receive_line(&mut self) {
        let line = std::mem::take(&mut self.partial);
        if line.is_empty() {
            self.resyncs += 1;
            if let Some(reply) = &self.resync_reply {
                self.rx.extend(reply);
            }
            return;
        }

        if self.script.front().is_some_and(|(cmd, _)| *cmd == line) {
            if let Some((_, reply)) = self.script.pop_front() {
                self.rx.extend(reply);
            }
        }
        self.commands.push(line);
    }
}

impl Default for ScriptedModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for ScriptedModule {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.rx.pop_front())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(data);
        for &byte in data {
            if byte == COMMAND_TERMINATOR {
                self.receive_line();
            } else {
                self.partial.push(byte);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn endpoint(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_ticks_per_reading() {
        let clock = ManualClock::with_tick(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(5));
        clock.sleep(Duration::from_millis(100));
        assert_eq!(clock.elapsed(), Duration::from_millis(110));
    }

    #[test]
    fn test_script_answers_in_order() {
        let mut module = ScriptedModule::new()
            .expect("VER", "A\n\r")
            .expect("STS", "B\n\r");

        // Out of order: STS is not the next scripted command.
        module.write_all(b"STS\r").unwrap();
        assert_eq!(module.unread(), 0);

        module.write_all(b"VER\r").unwrap();
        assert_eq!(module.unread(), 3);
        assert_eq!(module.pending_replies(), 1);
        assert_eq!(module.commands(), vec!["STS", "VER"]);
    }

    #[test]
    fn test_resync_reply() {
        let mut module = ScriptedModule::new();
        module.write_all(b"\r").unwrap();
        assert_eq!(module.resync_count(), 1);
        assert_eq!(module.unread(), 5);

        let mut silent = ScriptedModule::new().silent_resync();
        silent.write_all(b"\r").unwrap();
        assert_eq!(silent.unread(), 0);
        assert!(silent.commands().is_empty());
    }
}
