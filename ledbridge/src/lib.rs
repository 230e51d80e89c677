//! # ledbridge
//!
//! Drive the three LEDs of an Arduino sketch over a serial link.
//!
//! This crate provides the device side of the LED bridge:
//!
//! - LED commands (`on1` .. `off3`) and their wire encoding
//! - Arduino port discovery by port description
//! - A single lazily (re)connected serial link with a fixed-delay exchange
//! - Last-commanded LED state
//! - A worker thread that serializes all device access
//!
//! ## Wire protocol
//!
//! 9600 baud, 8N1. Each command is an ASCII token followed by `\n`. The sketch
//! may answer with one text line; anything arriving within 100 ms of the write
//! is read back.
//!
//! ## Features
//!
//! - `native` (default): Native serial port support via `serialport`
//! - `serde`: Serialization support for status types
//! - `mock`: Scripted serial backend for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use ledbridge::{Command, DeviceLink, LinkConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "native")]
//!     {
//!         let mut link = DeviceLink::new(ledbridge::NativeBackend, LinkConfig::default());
//!         let command: Command = "on1".parse()?;
//!         println!("{}", link.send_command(command));
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod discovery;
pub mod error;
pub mod link;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod port;
pub mod state;
pub mod worker;

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::{NativeBackend, NativePort};
pub use {
    command::{Action, Command, LedId},
    discovery::{DESCRIPTION_MARKERS, find_arduino_port, format_port_list},
    error::{Error, Result},
    link::{CONNECTION_FAILED, DeviceLink, Exchange, LinkConfig, NO_RESPONSE},
    port::{Port, PortInfo, SerialBackend, SerialConfig},
    state::{LedSnapshot, LedState},
    worker::{ConnectOutcome, Dispatched, LinkHandle, LinkStatus},
};
