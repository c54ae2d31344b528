//! Blocking host-side driver for BC118 "BLE Mate 2" radio modules.
//!
//! The driver talks to the module over any byte [`Channel`] (a TCP bridge, a
//! native serial port, or the scripted stand-in in [`mock`]). Each operation
//! resynchronizes the module, writes one command and waits, under a deadline
//! measured on a [`Clock`], for the line that decides its [`Outcome`].
//!
//! # Example
//!
//! ```rust
//! use blemate_driver::mock::{ManualClock, ScriptedModule};
//! use blemate_driver::BleMate;
//!
//! let module = ScriptedModule::new().expect(
//!     "VER",
//!     "Melody Smart v2.0\n\rBluetooth Address 0123456789AB\n\rOK\n\r",
//! );
//! let mut ble = BleMate::with_clock(module, ManualClock::new());
//! assert_eq!(ble.own_address().unwrap(), "0123456789AB");
//! ```

pub mod channel;
pub mod chunker;
pub mod clock;
pub mod config;
mod dispatcher;
mod driver;
pub mod error;
pub mod mock;
pub mod registry;

pub use channel::{Channel, TcpChannel};
#[cfg(feature = "serial")]
pub use channel::SerialChannel;
pub use clock::{Clock, Deadline, SystemClock};
pub use config::{ConfigError, DriverConfig};
pub use driver::BleMate;
pub use error::{DriverError, DriverResult, Outcome};
pub use registry::AddressRegistry;

pub use blemate_protocol::{BaudRate, ConfigKey, Role, ADDRESS_LEN};
