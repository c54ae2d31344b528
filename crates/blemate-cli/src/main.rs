//! `blemate`: drive a BC118 BLE Mate 2 module from the command line.
//!
//! ```bash
//! blemate --tcp 127.0.0.1:5000 version
//! blemate --serial /dev/ttyUSB0 scan --timeout 5 --connect-first
//! blemate --serial /dev/ttyUSB0 send "hello"
//! ```

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use blemate_driver::{BleMate, Channel, DriverResult, Outcome, TcpChannel, ADDRESS_LEN};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "blemate", version, about = "Control a BC118 BLE Mate 2 module")]
struct Cli {
    /// UART bridge address (host:port).
    #[arg(long, conflicts_with = "serial")]
    tcp: Option<String>,

    /// Serial device path.
    #[arg(long)]
    serial: Option<String>,

    /// Serial speed in bps.
    #[arg(long)]
    baud: Option<u32>,

    /// YAML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Reset the module and wait until it is ready.
    Reset,
    /// Restore factory defaults.
    Restore,
    /// Persist the current settings.
    WriteConfig,
    /// Print the module's own address.
    Version,
    /// Print the current role (central or peripheral).
    Role,
    /// Configure central mode (takes effect after write-config and reset).
    Central,
    /// Configure peripheral mode (takes effect after write-config and reset).
    Peripheral,
    /// Turn advertising on or off.
    Advertise {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Scan for devices.
    Scan {
        /// Scan length in seconds.
        #[arg(long, default_value_t = 5)]
        timeout: u32,
        /// Connect to the first device found.
        #[arg(long)]
        connect_first: bool,
    },
    /// Connect to a 12-digit address, or to an index from the last scan.
    Connect { target: String },
    /// Drop the current connection.
    Disconnect,
    /// Send text over the current connection.
    Send { text: String },
    /// Change the module's UART speed.
    Baud { rate: u32 },
    /// Read a configuration value.
    Get { name: String },
    /// Write a configuration value.
    Set { name: String, value: String },
    /// Send any command and wait for OK.
    Raw { command: String },
    /// Report the connection state.
    State,
}

impl Cmd {
    fn name(&self) -> &'static str {
        match self {
            Cmd::Reset => "reset",
            Cmd::Restore => "restore",
            Cmd::WriteConfig => "write-config",
            Cmd::Version => "version",
            Cmd::Role => "role",
            Cmd::Central => "central",
            Cmd::Peripheral => "peripheral",
            Cmd::Advertise { .. } => "advertise",
            Cmd::Scan { .. } => "scan",
            Cmd::Connect { .. } => "connect",
            Cmd::Disconnect => "disconnect",
            Cmd::Send { .. } => "send",
            Cmd::Baud { .. } => "baud",
            Cmd::Get { .. } => "get",
            Cmd::Set { .. } => "set",
            Cmd::Raw { .. } => "raw",
            Cmd::State => "state",
        }
    }
}

/// Failures before the module is reached.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] blemate_driver::ConfigError),

    #[error("no transport configured; pass --tcp or --serial")]
    NoTransport,

    #[error("failed to open {endpoint}: {message}")]
    Open { endpoint: String, message: String },

    #[cfg(not(feature = "serial"))]
    #[error("this build has no serial port support")]
    SerialUnavailable,
}

#[derive(Debug, Serialize)]
struct Report {
    command: &'static str,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn open_channel(cli: &Cli, config: &CliConfig) -> Result<Box<dyn Channel>, CliError> {
    let tcp = match cli.serial {
        Some(_) => None,
        None => cli.tcp.as_ref().or(config.tcp.as_ref()),
    };
    if let Some(addr) = tcp {
        let channel = TcpChannel::connect(addr.as_str()).map_err(|e| CliError::Open {
            endpoint: addr.clone(),
            message: e.to_string(),
        })?;
        return Ok(Box::new(channel));
    }

    let path = cli
        .serial
        .as_ref()
        .or(config.serial.as_ref())
        .ok_or(CliError::NoTransport)?;
    let baud = cli.baud.unwrap_or(config.baud);
    open_serial(path, baud)
}

#[cfg(feature = "serial")]
fn open_serial(path: &str, baud: u32) -> Result<Box<dyn Channel>, CliError> {
    let channel =
        blemate_driver::SerialChannel::open(path, baud).map_err(|e| CliError::Open {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;
    Ok(Box::new(channel))
}

#[cfg(not(feature = "serial"))]
fn open_serial(_path: &str, _baud: u32) -> Result<Box<dyn Channel>, CliError> {
    Err(CliError::SerialUnavailable)
}

/// Run one subcommand, returning whatever it produced worth printing.
fn execute<C: Channel>(ble: &mut BleMate<C>, cmd: &Cmd) -> DriverResult<Option<Value>> {
    match cmd {
        Cmd::Reset => ble.reset().map(|()| None),
        Cmd::Restore => ble.restore().map(|()| None),
        Cmd::WriteConfig => ble.write_config().map(|()| None),
        Cmd::Version => ble.own_address().map(|a| Some(json!(a))),
        Cmd::Role => ble.role().map(|r| Some(json!(r.as_str()))),
        Cmd::Central => ble.central_mode().map(|()| None),
        Cmd::Peripheral => ble.peripheral_mode().map(|()| None),
        Cmd::Advertise { state: Toggle::On } => ble.advertise().map(|()| None),
        Cmd::Advertise { state: Toggle::Off } => ble.stop_advertising().map(|()| None),
        Cmd::Scan {
            timeout,
            connect_first,
        } => {
            ble.scan(*timeout)?;
            if *connect_first {
                ble.connect_index(0)?;
            }
            Ok(Some(json!(ble.addresses())))
        }
        Cmd::Connect { target } => connect(ble, target).map(|()| None),
        Cmd::Disconnect => ble.disconnect().map(|()| None),
        Cmd::Send { text } => ble.send_str(text).map(|()| None),
        Cmd::Baud { rate } => ble.set_baud_rate(*rate).map(|()| None),
        Cmd::Get { name } => ble.get_param(name).map(|v| Some(json!(v))),
        Cmd::Set { name, value } => ble.set_param(name, value).map(|()| None),
        Cmd::Raw { command } => ble.command(command).map(|()| None),
        Cmd::State => Ok(Some(json!(ble.connection_state()))),
    }
}

/// A 12-character target is an address; anything else numeric is an index.
fn connect<C: Channel>(ble: &mut BleMate<C>, target: &str) -> DriverResult<()> {
    match target.parse::<usize>() {
        Ok(index) if target.len() != ADDRESS_LEN => ble.connect_index(index),
        _ => ble.connect(target),
    }
}

fn print_plain(report: &Report) {
    if let Some(error) = &report.error {
        eprintln!("{}: {} ({})", report.command, error, report.outcome);
        return;
    }
    match &report.value {
        None => println!("{}", report.outcome),
        Some(Value::String(s)) => println!("{}", s),
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => println!("{}: {}", index, s),
                    other => println!("{}: {}", index, other),
                }
            }
        }
        Some(other) => println!("{}", other),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    blemate_metrics::describe_metrics();

    let config = match &cli.config {
        Some(path) => CliConfig::from_file(path),
        None => Ok(CliConfig::default()),
    };
    let channel = config
        .map_err(CliError::from)
        .and_then(|config| open_channel(&cli, &config).map(|channel| (channel, config)));
    let (channel, config) = match channel {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("blemate: {}", e);
            return ExitCode::FAILURE;
        }
    };

    debug!("talking to {}", channel.endpoint());
    let mut ble = BleMate::new(channel).with_config(config.driver);
    let result = execute(&mut ble, &cli.command);

    let report = Report {
        command: cli.command.name(),
        outcome: Outcome::of(&result),
        error: result.as_ref().err().map(ToString::to_string),
        value: result.ok().flatten(),
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("blemate: {}", e),
        }
    } else {
        print_plain(&report);
    }

    if report.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
