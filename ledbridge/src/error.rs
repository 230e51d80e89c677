//! Error types for ledbridge.

use std::io;
use thiserror::Error;

/// Result type for ledbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ledbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on an open serial connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error (enumeration or open).
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No serial port matched a known Arduino description.
    #[error("Arduino not found")]
    DeviceNotFound,

    /// The device replied with bytes that are not valid UTF-8.
    #[error("Invalid reply encoding: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// A command token outside the whitelist.
    #[error("Invalid command: {0:?}")]
    InvalidCommand(String),

    /// The device worker thread is no longer running.
    #[error("Device worker stopped")]
    WorkerStopped,
}
