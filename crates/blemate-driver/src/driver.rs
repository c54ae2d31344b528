//! The [`BleMate`] driver: every public module operation.

use blemate_metrics::{metric_defs, MetricLabels};
use blemate_protocol::{
    validate_address, BaudRate, Command, ConfigKey, LineCodec, ResponseRule, Role,
};
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::clock::{Clock, SystemClock};
use crate::config::DriverConfig;
use crate::dispatcher::Capture;
use crate::error::{DriverError, DriverResult, Outcome};
use crate::registry::AddressRegistry;

/// Driver for one BC118 module on one channel.
///
/// Every operation takes `&mut self` and runs to completion (or its deadline)
/// before returning. The driver owns the channel, so nothing else can
/// interleave bytes with a running exchange.
#[derive(Debug)]
pub struct BleMate<C, K = SystemClock> {
    pub(crate) channel: C,
    pub(crate) clock: K,
    pub(crate) config: DriverConfig,
    pub(crate) codec: LineCodec,
    pub(crate) registry: AddressRegistry,
    pub(crate) labels: MetricLabels,
}

impl<C: Channel> BleMate<C, SystemClock> {
    /// Drive the module on `channel` with default timings.
    pub fn new(channel: C) -> Self {
        Self::with_clock(channel, SystemClock::new())
    }
}

impl<C: Channel, K: Clock> BleMate<C, K> {
    /// Drive the module on `channel`, measuring time with `clock`.
    pub fn with_clock(channel: C, clock: K) -> Self {
        Self::with_clock_and_config(channel, clock, DriverConfig::default())
    }

    /// Driver with an explicit clock and deadlines.
    pub fn with_clock_and_config(channel: C, clock: K, config: DriverConfig) -> Self {
        let labels = MetricLabels::new(channel.endpoint());
        BleMate {
            channel,
            clock,
            config,
            codec: LineCodec::new(),
            registry: AddressRegistry::new(),
            labels,
        }
    }

    /// Replace the timing configuration.
    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying transport.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutable access to the transport.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// The clock deadlines are measured on.
    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Active deadlines.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Addresses found by the last scan.
    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    /// Give the channel back.
    pub fn into_channel(self) -> C {
        self.channel
    }

    // ========================================================================
    // Generic commands
    // ========================================================================

    /// Send any command text and wait for `OK`.
    pub fn command(&mut self, text: &str) -> DriverResult<()> {
        let command = Command::Raw {
            command: text.to_string(),
        };
        self.run(&command, self.config.command_timeout(), ResponseRule::Standard)?
            .outcome
            .into_result()
    }

    /// `SET <name>=<value>`.
    pub fn set_param(&mut self, name: &str, value: &str) -> DriverResult<()> {
        let command = Command::SetConfigRaw {
            key: name.to_string(),
            value: value.to_string(),
        };
        self.write_setting(&command)
    }

    /// `GET <name>`; returns the text after `<name>=`, trimmed.
    ///
    /// A module that answers `OK` without echoing the value yields an empty
    /// string.
    pub fn get_param(&mut self, name: &str) -> DriverResult<String> {
        let command = Command::GetConfigRaw {
            key: name.to_string(),
        };
        self.read_setting(&command, name)
    }

    /// Typed [`set_param`](Self::set_param).
    pub fn set_config(&mut self, key: ConfigKey, value: &str) -> DriverResult<()> {
        let command = Command::SetConfig {
            key,
            value: value.to_string(),
        };
        self.write_setting(&command)
    }

    /// Typed [`get_param`](Self::get_param).
    pub fn get_config(&mut self, key: ConfigKey) -> DriverResult<String> {
        self.read_setting(&Command::GetConfig { key }, key.as_str())
    }

    fn write_setting(&mut self, command: &Command) -> DriverResult<()> {
        self.run(command, self.config.param_timeout(), ResponseRule::Standard)?
            .outcome
            .into_result()
    }

    fn read_setting(&mut self, command: &Command, key: &str) -> DriverResult<String> {
        let rule = ResponseRule::GetParam {
            key: key.to_string(),
        };
        match self.run(command, self.config.param_timeout(), rule)?.into_capture()? {
            Some(Capture::Value(value)) => Ok(value),
            _ => Ok(String::new()),
        }
    }

    // ========================================================================
    // Housekeeping
    // ========================================================================

    /// Reset the module and wait for it to come back.
    ///
    /// Once the ready banner arrives, scanning is switched off, the driver
    /// waits for the settle delay, and everything still buffered is dropped.
    pub fn reset(&mut self) -> DriverResult<()> {
        self.run(&Command::Reset, self.config.reset_timeout(), ResponseRule::Reset)?
            .outcome
            .into_result()?;

        self.scan_off_after(Command::Reset.name())?;
        self.clock.sleep(self.config.reset_settle());
        let dropped = self.drain()?;
        info!("module reset ({} trailing bytes dropped)", dropped);
        Ok(())
    }

    /// Restore factory defaults (`RTR`).
    pub fn restore(&mut self) -> DriverResult<()> {
        self.run(&Command::Restore, self.config.command_timeout(), ResponseRule::Standard)?
            .outcome
            .into_result()
    }

    /// Persist the current settings (`WRT`).
    pub fn write_config(&mut self) -> DriverResult<()> {
        self.run(&Command::WriteConfig, self.config.command_timeout(), ResponseRule::Standard)?
            .outcome
            .into_result()
    }

    /// Change the module's UART speed.
    ///
    /// Only takes effect after [`write_config`](Self::write_config) and
    /// [`reset`](Self::reset). Unsupported rates are rejected without I/O.
    pub fn set_baud_rate(&mut self, bps: u32) -> DriverResult<()> {
        let rate = BaudRate::try_from(bps)?;
        self.set_config(ConfigKey::Uart, rate.code())
    }

    // ========================================================================
    // Identity and role
    // ========================================================================

    /// The module's own 12-character address, from the `VER` banner.
    pub fn own_address(&mut self) -> DriverResult<String> {
        let exchange = self.run(
            &Command::Version,
            self.config.version_timeout(),
            ResponseRule::Identity,
        )?;
        match exchange.into_capture()? {
            Some(Capture::Address(address)) => Ok(address),
            _ => Err(DriverError::Module),
        }
    }

    /// The module's current role, queried live.
    pub fn role(&mut self) -> DriverResult<Role> {
        let exchange = self.run(
            &Command::Status,
            self.config.status_timeout(),
            ResponseRule::Status,
        )?;
        match exchange.into_capture()? {
            Some(Capture::Role(role)) => Ok(role),
            _ => Err(DriverError::Module),
        }
    }

    /// Whether the module is currently central.
    pub fn is_central(&mut self) -> DriverResult<bool> {
        Ok(self.role()? == Role::Central)
    }

    /// Configure the module as central (`SET CENT=ON`).
    ///
    /// Takes effect after `write_config` and `reset`.
    pub fn central_mode(&mut self) -> DriverResult<()> {
        self.set_config(ConfigKey::Central, "ON")
    }

    /// Configure the module as peripheral (`SET CENT=OFF`).
    pub fn peripheral_mode(&mut self) -> DriverResult<()> {
        self.set_config(ConfigKey::Central, "OFF")
    }

    /// Start advertising (`ADV ON`).
    pub fn advertise(&mut self) -> DriverResult<()> {
        self.set_advertising(true)
    }

    /// Stop advertising (`ADV OFF`).
    pub fn stop_advertising(&mut self) -> DriverResult<()> {
        self.set_advertising(false)
    }

    fn set_advertising(&mut self, enabled: bool) -> DriverResult<()> {
        self.run(
            &Command::Advertise { enabled },
            self.config.command_timeout(),
            ResponseRule::Standard,
        )?
        .outcome
        .into_result()
    }

    // ========================================================================
    // Scanning and connections
    // ========================================================================

    /// Scan for `timeout` seconds and return how many devices were found.
    ///
    /// The registry is cleared first. A scan that hears lines but no device
    /// fails with [`DriverError::Remote`]; one that hears nothing at all times
    /// out. Finding the fifth device ends the scan early.
    pub fn scan(&mut self, timeout: u32) -> DriverResult<usize> {
        if let Err(e) = self.set_config(ConfigKey::ScanTimeout, &timeout.to_string()) {
            if let DriverError::Io(_) = e {
                return Err(e);
            }
            warn!("could not set scan timeout to {}: {}", timeout, e);
        }
        self.registry.reset();

        let result = self
            .run(&Command::ScanOn, self.config.scan_timeout(timeout), ResponseRule::Scan)
            .and_then(|exchange| exchange.outcome.into_result());

        let count = self.registry.count();
        metrics::gauge!(metric_defs::REGISTRY_ADDRESSES.name, &self.labels.to_labels())
            .set(count as f64);
        result?;
        info!("scan found {} device(s)", count);
        Ok(count)
    }

    /// Number of addresses found by the last scan.
    pub fn address_count(&self) -> usize {
        self.registry.count()
    }

    /// Address `index` from the last scan.
    pub fn address(&self, index: usize) -> DriverResult<&str> {
        self.registry.get(index)
    }

    /// All addresses from the last scan, in discovery order.
    pub fn addresses(&self) -> Vec<String> {
        self.registry.iter().map(str::to_string).collect()
    }

    /// Connect to the device at `index` in the scan results.
    pub fn connect_index(&mut self, index: usize) -> DriverResult<()> {
        let address = self.registry.get(index)?.to_string();
        self.connect(&address)
    }

    /// Connect to the device with the given 12-character address.
    pub fn connect(&mut self, address: &str) -> DriverResult<()> {
        validate_address(address)?;
        let command = Command::Connect {
            address: address.to_string(),
        };
        self.run(&command, self.config.connect_timeout(), ResponseRule::Connect)?
            .outcome
            .into_result()?;
        info!("connected to {}", address);
        Ok(())
    }

    /// Always [`Outcome::Timeout`]. The module offers no reliable way to ask,
    /// so nothing is sent.
    pub fn connection_state(&self) -> Outcome {
        Outcome::Timeout
    }

    /// Drop the current connection, then switch scanning off.
    pub fn disconnect(&mut self) -> DriverResult<()> {
        self.run(
            &Command::Disconnect,
            self.config.disconnect_timeout(),
            ResponseRule::Disconnect,
        )?
        .outcome
        .into_result()?;
        self.scan_off_after(Command::Disconnect.name())
    }

    /// Follow-up `SCN OFF`. Only transport failures are reported.
    fn scan_off_after(&mut self, after: &str) -> DriverResult<()> {
        match self.run(&Command::ScanOff, self.config.command_timeout(), ResponseRule::Standard) {
            Ok(exchange) if exchange.outcome.is_success() => Ok(()),
            Ok(exchange) => {
                debug!("scan off after {} ended with {}", after, exchange.outcome);
                Ok(())
            }
            Err(DriverError::Io(e)) => Err(DriverError::Io(e)),
            Err(e) => {
                debug!("scan off after {} failed: {}", after, e);
                Ok(())
            }
        }
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
    fn test_get_param_captures_value() {
        let mut ble = driver(ScriptedModule::new().expect("GET CENT", "CENT=ON \n\rOK\n\r"));
        assert_eq!(ble.get_param("CENT").unwrap(), "ON");
    }

    #[test]
    fn test_get_param_without_value_line() {
        let mut ble = driver(ScriptedModule::new().expect("GET CENT", "OK\n\r"));
        assert_eq!(ble.get_param("CENT").unwrap(), "");
    }

    #[test]
    fn test_set_param_error() {
        let mut ble = driver(ScriptedModule::new().expect("SET CENT=MAYBE", "ERR\n\r"));
        let err = ble.set_param("CENT", "MAYBE").unwrap_err();
        assert_eq!(err.outcome(), Outcome::ModuleError);
    }

    #[test]
    fn test_typed_config_uses_key_names() {
        let mut ble = driver(
            ScriptedModule::new()
                .expect("SET UART=0028", "OK\n\r")
                .expect("GET CENT", "CENT=OFF\n\rOK\n\r"),
        );
        ble.set_config(ConfigKey::Uart, "0028").unwrap();
        assert_eq!(ble.get_config(ConfigKey::Central).unwrap(), "OFF");
        assert_eq!(ble.channel().commands(), vec!["SET UART=0028", "GET CENT"]);
    }

    #[test]
    fn test_central_and_peripheral_mode() {
        let mut ble = driver(
            ScriptedModule::new()
                .expect("SET CENT=ON", "OK\n\r")
                .expect("SET CENT=OFF", "OK\n\r"),
        );
        ble.central_mode().unwrap();
        ble.peripheral_mode().unwrap();
        assert_eq!(ble.channel().commands(), vec!["SET CENT=ON", "SET CENT=OFF"]);
    }

    #[test]
    fn test_role_query() {
        let mut ble = driver(
            ScriptedModule::new()
                .expect("STS", "STS C 0 0\n\rOK\n\r")
                .expect("STS", "STS P 0 0\n\rOK\n\r"),
        );
        assert_eq!(ble.role().unwrap(), Role::Central);
        assert!(!ble.is_central().unwrap());
    }

    #[test]
    fn test_role_without_status_line_is_module_error() {
        let mut ble = driver(ScriptedModule::new().expect("STS", "OK\n\r"));
        assert_eq!(ble.role().unwrap_err().outcome(), Outcome::ModuleError);
    }

    #[test]
    fn test_advertise_on_off() {
        let mut ble = driver(
            ScriptedModule::new()
                .expect("ADV ON", "OK\n\r")
                .expect("ADV OFF", "OK\n\r"),
        );
        ble.advertise().unwrap();
        ble.stop_advertising().unwrap();
        assert_eq!(ble.channel().pending_replies(), 0);
    }

    #[test]
    fn test_connect_rejects_short_address() {
        let mut ble = driver(ScriptedModule::new());
        let err = ble.connect("0123").unwrap_err();
        assert_eq!(err.outcome(), Outcome::InvalidParameter);
        assert!(ble.channel().written().is_empty());
    }

    #[test]
    fn test_connection_state_is_timeout_without_io() {
        let ble = driver(ScriptedModule::new());
        assert_eq!(ble.connection_state(), Outcome::Timeout);
        assert!(ble.channel().written().is_empty());
    }

    #[test]
    fn test_disconnect_turns_scan_off() {
        let mut ble = driver(
            ScriptedModule::new()
                .expect("DCN", "DCN 0\n\r")
                .expect("SCN OFF", "OK\n\r"),
        );
        ble.disconnect().unwrap();
        assert_eq!(ble.channel().commands(), vec!["DCN", "SCN OFF"]);
    }

    #[test]
    fn test_disconnect_ignores_failed_scan_off() {
        let mut ble = driver(
            ScriptedModule::new()
                .expect("DCN", "DCN 0\n\r")
                .expect("SCN OFF", "ERR\n\r"),
        );
        assert!(ble.disconnect().is_ok());
    }
}
