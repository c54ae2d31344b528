//! BC118 BLE Mate 2 UART Protocol
//!
//! This crate provides types and utilities for talking to a BlueCreation BC118
//! ("BLE Mate 2") radio module over its UART command interface. The module
//! speaks a simple line-based text protocol.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → module): ASCII text terminated with `\r`
//! - **Responses** (module → host): ASCII lines terminated with `\n\r`
//! - **Status**: a command ends with a line starting with `OK` or `ER`, except
//!   for streaming responses (scan results) where the module simply goes quiet
//!
//! # Command Types
//!
//! - **Get commands**: `GET <NAME>` - the module echoes `<NAME>=<VALUE>` before `OK`
//! - **Set commands**: `SET <NAME>=<VALUE>` - returns `OK`
//! - **Action commands**: `RST`, `RTR`, `WRT`, `SCN ON`, `CON <ADDR> 0`, `DCN`, ...
//! - **Query commands**: `VER`, `STS`
//!
//! Which response lines matter depends on the command that triggered them, so
//! lines are classified against a [`ResponseRule`] rather than on their own.
//!
//! # Example
//!
//! ```rust
//! use blemate_protocol::{Command, LineCodec, Response, ResponseRule};
//!
//! // Build a command
//! let cmd = Command::Version;
//! assert_eq!(cmd.encode(), b"VER\r");
//!
//! // Accumulate bytes until a line completes, then classify it
//! let mut codec = LineCodec::new();
//! let mut line = None;
//! for &byte in b"OK\n\r" {
//!     line = codec.push_byte(byte);
//! }
//! let response = Response::classify(&line.unwrap(), &ResponseRule::Standard);
//! assert_eq!(response, Response::Ok);
//! ```

mod codec;
mod commands;
mod constants;
mod error;
mod responses;

pub use codec::*;
pub use commands::*;
pub use constants::*;
pub use error::*;
pub use responses::*;
