//! Port abstraction for serial communication.
//!
//! The device link never talks to the `serialport` crate directly. It goes
//! through two traits:
//!
//! - [`SerialBackend`] enumerates ports and opens them
//! - [`Port`] is a single open connection
//!
//! ```text
//! +------------------+
//! |   DeviceLink     |
//! +--------+---------+
//!          |
//!          v
//! +--------+---------+     +------------------+
//! |  SerialBackend   | --> |    Port trait    |
//! +--------+---------+     +--------+---------+
//!          |                        |
//!          v                        v
//! +--------+---------+     +--------+---------+
//! |  NativeBackend   |     |   NativePort     |
//! |   (serialport)   |     |   (serialport)   |
//! +------------------+     +------------------+
//! ```
//!
//! Tests substitute scripted backends to stand in for a real controller.

#[cfg(feature = "native")]
pub mod native;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Baud rate the controller firmware listens at.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout applied to every open port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial port configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyACM0", "COM5").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial port information.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PortInfo {
    /// Port name/path.
    pub name: String,
    /// Human-readable description (USB product string, or "n/a").
    pub description: String,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Serial number (if available).
    pub serial_number: Option<String>,
}

impl PortInfo {
    /// A port known only by name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            vid: None,
            pid: None,
            manufacturer: None,
            serial_number: None,
        }
    }
}

/// An open serial connection.
pub trait Port: Read + Write + Send {
    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Number of bytes waiting in the receive buffer.
    fn bytes_to_read(&self) -> Result<u32>;

    /// Close the port and release resources.
    ///
    /// After calling this method, the port cannot be used for further I/O.
    fn close(&mut self) -> Result<()>;

    /// Write all bytes, blocking until complete.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<()> {
        std::io::Write::write_all(self, buf)?;
        std::io::Write::flush(self)?;
        Ok(())
    }
}

/// Source of serial ports: enumeration plus opening.
pub trait SerialBackend: Send {
    /// List all available serial ports, in OS enumeration order.
    fn list_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open a port with the given configuration.
    fn open(&self, config: &SerialConfig) -> Result<Box<dyn Port>>;
}

// Re-export the native implementation when enabled
#[cfg(feature = "native")]
pub use native::{NativeBackend, NativePort};
