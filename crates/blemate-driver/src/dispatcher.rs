//! The command/response engine every module operation runs on.
//!
//! One exchange is always the same shape: flush any half-typed command out of
//! the module, write the real command, then poll the channel byte by byte
//! under a single deadline, classifying each completed line until one of
//! them ends the exchange or the deadline passes. Operations differ only in
//! the command, the deadline and the [`ResponseRule`] used to classify lines.

use std::time::Duration;

use blemate_metrics::metric_defs;
use blemate_protocol::{validate_address, Command, Response, ResponseRule, Role};
use tracing::{debug, trace, warn};

use crate::channel::Channel;
use crate::clock::{Clock, Deadline};
use crate::driver::BleMate;
use crate::error::{DriverError, DriverResult, Outcome};

/// A value picked out of the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Capture {
    /// `GET` value.
    Value(String),
    /// Module address from `VER`.
    Address(String),
    /// Role from `STS`.
    Role(Role),
}

/// What one exchange produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Exchange {
    pub outcome: Outcome,
    pub capture: Option<Capture>,
}

impl Exchange {
    /// Fail unless the exchange succeeded; hand back the capture otherwise.
    pub fn into_capture(self) -> DriverResult<Option<Capture>> {
        self.outcome.into_result()?;
        Ok(self.capture)
    }
}

/// Effect of one classified line on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Terminal(Outcome),
    Continue,
}

/// Outcome reported on `OK` (or, for scans, at the deadline) when nothing was
/// captured yet.
fn initial_outcome(rule: &ResponseRule) -> Outcome {
    match rule {
        ResponseRule::Identity | ResponseRule::Status => Outcome::ModuleError,
        ResponseRule::Scan => Outcome::RemoteError,
        _ => Outcome::Success,
    }
}

impl<C: Channel, K: Clock> BleMate<C, K> {
    /// Run one complete exchange: resync, send, collect.
    pub(crate) fn run(
        &mut self,
        command: &Command,
        timeout: Duration,
        rule: ResponseRule,
    ) -> DriverResult<Exchange> {
        let started = self.clock.now();
        let result = self.exchange(command, timeout, &rule);

        let outcome = match &result {
            Ok(exchange) => exchange.outcome,
            Err(e) => e.outcome(),
        };
        let labels = self.labels.with_command(command.name());
        metrics::counter!(
            metric_defs::COMMAND_OUTCOME.name,
            &labels.with(&[("outcome", outcome.as_str().to_string())])
        )
        .increment(1);
        metrics::histogram!(metric_defs::COMMAND_DURATION.name, &labels.to_labels())
            .record(self.clock.now().saturating_sub(started).as_secs_f64() * 1000.0);
        if let Err(DriverError::Io(e)) = &result {
            warn!("{}: transport failed during {}: {}", self.labels.port, command.name(), e);
        }
        debug!("{} -> {}", command.name(), outcome);

        result
    }

    fn exchange(
        &mut self,
        command: &Command,
        timeout: Duration,
        rule: &ResponseRule,
    ) -> DriverResult<Exchange> {
        self.resync()?;
        self.transmit(command)?;
        self.collect(timeout, rule)
    }

    /// Drop stale input, write a bare terminator and wait for the module to
    /// answer with a line.
    ///
    /// Bytes left over from an earlier exchange (a scan cut short at capacity,
    /// trailing reset noise) are discarded first, so the line that completes
    /// the resync is the module's answer to it. A partial command left in the module by an earlier, aborted exchange is
    /// terminated by this and answered (usually with `ERR`). Whatever the line
    /// says, getting one back means the module is in a known state. The idle
    /// window restarts with every received byte.
    fn resync(&mut self) -> DriverResult<()> {
        let stale = self.drain()?;
        if stale > 0 {
            trace!("dropped {} stale bytes before resync", stale);
        }
        self.channel.write_all(&Command::Resync.encode())?;
        self.channel.flush()?;
        self.codec.clear();

        let mut idle = Deadline::start(&self.clock, self.config.resync_idle());
        loop {
            if let Some(byte) = self.poll_byte()? {
                idle = Deadline::start(&self.clock, self.config.resync_idle());
                if let Some(line) = self.codec.push_byte(byte) {
                    trace!("resync answered with {:?}", line);
                    return Ok(());
                }
            }
            if idle.expired(&self.clock) {
                warn!("{}: module did not answer resync", self.labels.port);
                metrics::counter!(metric_defs::RESYNC_FAILED.name, &self.labels.to_labels())
                    .increment(1);
                return Err(DriverError::Timeout);
            }
        }
    }

    /// Write a command and wait for it to leave the host.
    fn transmit(&mut self, command: &Command) -> DriverResult<()> {
        let frame = command.encode();
        debug!("sending {:?} ({} bytes)", command.to_command_string(), frame.len());
        self.channel.write_all(&frame)?;
        self.channel.flush()?;
        metrics::counter!(
            metric_defs::COMMAND_SENT.name,
            &self.labels.with_command(command.name()).to_labels()
        )
        .increment(1);
        Ok(())
    }

    /// Accumulate and classify lines until a terminal one or the deadline.
    fn collect(&mut self, timeout: Duration, rule: &ResponseRule) -> DriverResult<Exchange> {
        self.codec.clear();
        let deadline = Deadline::start(&self.clock, timeout);
        let mut pending = initial_outcome(rule);
        let mut capture = None;
        let mut lines_seen = 0usize;

        loop {
            if deadline.expired(&self.clock) {
                // A scan ends by going quiet; only total silence is a timeout.
                let outcome = if *rule == ResponseRule::Scan && lines_seen > 0 {
                    pending
                } else {
                    Outcome::Timeout
                };
                return Ok(Exchange { outcome, capture });
            }

            let Some(byte) = self.poll_byte()? else {
                continue;
            };
            let Some(line) = self.codec.push_byte(byte) else {
                continue;
            };

            lines_seen += 1;
            trace!("rx {:?}", line);
            metrics::counter!(metric_defs::LINE_RECEIVED.name, &self.labels.to_labels())
                .increment(1);

            let response = Response::classify(&line, rule);
            if let Verdict::Terminal(outcome) = self.verdict(response, &mut pending, &mut capture) {
                return Ok(Exchange { outcome, capture });
            }
        }
    }

    /// Apply one classified line to the exchange state.
    fn verdict(
        &mut self,
        response: Response,
        pending: &mut Outcome,
        capture: &mut Option<Capture>,
    ) -> Verdict {
        match response {
            Response::Error(line) => {
                debug!("module error: {:?}", line);
                Verdict::Terminal(Outcome::ModuleError)
            }
            Response::Ok => Verdict::Terminal(*pending),
            Response::Value(value) => {
                *capture = Some(Capture::Value(value));
                Verdict::Continue
            }
            Response::Identity { address } => {
                *capture = Some(Capture::Address(address));
                *pending = Outcome::Success;
                Verdict::Continue
            }
            Response::Status { role } => {
                *capture = Some(Capture::Role(role));
                *pending = Outcome::Success;
                Verdict::Continue
            }
            Response::ScanReport { address } => {
                if validate_address(&address).is_err() {
                    debug!("ignoring malformed scan report address {:?}", address);
                } else if self.registry.offer(&address) {
                    debug!("found {} ({} known)", address, self.registry.count());
                }
                if !self.registry.is_empty() {
                    *pending = Outcome::Success;
                }
                if self.registry.is_full() {
                    Verdict::Terminal(Outcome::Success)
                } else {
                    Verdict::Continue
                }
            }
            Response::Ready | Response::Connected | Response::Disconnected => {
                Verdict::Terminal(Outcome::Success)
            }
            Response::Noise(_) => Verdict::Continue,
        }
    }

    /// Read one byte if the channel has one.
    fn poll_byte(&mut self) -> DriverResult<Option<u8>> {
        if self.channel.bytes_available()? == 0 {
            return Ok(None);
        }
        Ok(self.channel.read_byte()?)
    }

    /// Throw away everything the channel currently holds.
    pub(crate) fn drain(&mut self) -> DriverResult<usize> {
        let mut dropped = 0;
        while self.poll_byte()?.is_some() {
            dropped += 1;
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ManualClock, ScriptedModule};

    fn driver(module: ScriptedModule) -> BleMate<ScriptedModule, ManualClock> {
        BleMate::with_clock(module, ManualClock::new())
    }

    #[test]
    fn test_resync_then_command() {
        let mut ble = driver(ScriptedModule::new().expect("RTR", "OK\n\r"));
        let exchange = ble
            .run(
                &Command::Restore,
                Duration::from_secs(3),
                ResponseRule::Standard,
            )
            .unwrap();

        assert_eq!(exchange.outcome, Outcome::Success);
        assert_eq!(ble.channel().written(), b"\rRTR\r");
    }

    #[test]
    fn test_silent_module_times_out_for_every_rule() {
        let rules = [
            ResponseRule::Standard,
            ResponseRule::GetParam { key: "CENT".to_string() },
            ResponseRule::Identity,
            ResponseRule::Scan,
            ResponseRule::Reset,
            ResponseRule::Connect,
            ResponseRule::Disconnect,
            ResponseRule::Status,
        ];
        for rule in rules {
            let mut ble = driver(ScriptedModule::new());
            let exchange = ble
                .run(&Command::Version, Duration::from_millis(200), rule.clone())
                .unwrap();
            assert_eq!(exchange.outcome, Outcome::Timeout, "rule {:?}", rule);
        }
    }

    #[test]
    fn test_partial_line_is_never_classified() {
        // "OK" without the end-of-line marker must not end the exchange.
        let mut ble = driver(ScriptedModule::new().expect("WRT", "OK"));
        let exchange = ble
            .run(&Command::WriteConfig, Duration::from_millis(100), ResponseRule::Standard)
            .unwrap();
        assert_eq!(exchange.outcome, Outcome::Timeout);
    }

    #[test]
    fn test_error_line_stops_reading() {
        let mut ble = driver(ScriptedModule::new().expect("VER", "ERR\n\rOK\n\r"));
        let exchange = ble
            .run(&Command::Version, Duration::from_secs(2), ResponseRule::Identity)
            .unwrap();

        assert_eq!(exchange.outcome, Outcome::ModuleError);
        assert_eq!(ble.channel().unread(), 4);
    }

    #[test]
    fn test_resync_timeout_skips_command() {
        let mut ble = driver(ScriptedModule::new().silent_resync().expect("RTR", "OK\n\r"));
        let err = ble
            .run(&Command::Restore, Duration::from_secs(3), ResponseRule::Standard)
            .unwrap_err();

        assert_eq!(err.outcome(), Outcome::Timeout);
        assert_eq!(ble.channel().written(), b"\r");
    }

    #[test]
    fn test_stale_input_does_not_answer_resync() {
        let mut module = ScriptedModule::new().expect("RTR", "OK\n\r");
        module.inject("SCN=0 000000000006 -61\n\r");
        let mut ble = driver(module);

        let exchange = ble
            .run(&Command::Restore, Duration::from_secs(3), ResponseRule::Standard)
            .unwrap();

        assert_eq!(exchange.outcome, Outcome::Success);
        assert_eq!(ble.channel().unread(), 0);
    }

    #[test]
    fn test_resync_accepts_any_line() {
        let mut ble = driver(
            ScriptedModule::new()
                .resync_reply("whatever\n\r")
                .expect("RTR", "OK\n\r"),
        );
        let exchange = ble
            .run(&Command::Restore, Duration::from_secs(3), ResponseRule::Standard)
            .unwrap();
        assert_eq!(exchange.outcome, Outcome::Success);
    }

    #[test]
    fn test_deadline_is_measured_on_the_clock() {
        let mut ble = driver(ScriptedModule::new());
        let before = ble.clock().elapsed();
        ble.run(&Command::WriteConfig, Duration::from_millis(300), ResponseRule::Standard)
            .unwrap();
        let spent = ble.clock().elapsed() - before;

        // Resync gets an immediate answer, so nearly all the time is the
        // command's own deadline.
        assert!(spent >= Duration::from_millis(300));
        assert!(spent < Duration::from_millis(400));
    }
}
