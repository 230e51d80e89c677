//! The serial link to the controller.
//!
//! [`DeviceLink`] holds at most one open port and runs the command exchange:
//! write the command line, wait a fixed time, read back one line if anything
//! arrived. There is no acknowledgement framing. A busy controller, an absent
//! one and a reply slower than the wait all look the same from here.

use std::fmt;
use std::io::{ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::{
    command::Command,
    discovery::find_arduino_port,
    error::{Error, Result},
    port::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT, Port, SerialBackend, SerialConfig},
};

/// Returned when no connection could be established for a command.
pub const CONNECTION_FAILED: &str = "Connection failed";

/// Returned when the command was written but nothing came back in time.
pub const NO_RESPONSE: &str = "Command sent (no response)";

/// Wait after opening the port; Arduino boards reset when the port opens.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Wait between writing a command and checking for a reply.
pub const DEFAULT_REPLY_WAIT: Duration = Duration::from_millis(100);

/// Longest reply line kept; the rest of an overlong line is left unread.
pub const MAX_REPLY_LEN: usize = 256;

/// Link timing and port selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Use this port instead of scanning for one.
    pub port_name: Option<String>,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read timeout of the open port.
    pub read_timeout: Duration,
    /// Sleep after a successful open.
    pub settle_delay: Duration,
    /// Sleep between write and reply check.
    pub reply_wait: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_name: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            reply_wait: DEFAULT_REPLY_WAIT,
        }
    }
}

impl LinkConfig {
    /// Override both fixed delays.
    #[must_use]
    pub fn with_delays(mut self, settle_delay: Duration, reply_wait: Duration) -> Self {
        self.settle_delay = settle_delay;
        self.reply_wait = reply_wait;
        self
    }

    /// Pin the link to a named port.
    #[must_use]
    pub fn with_port_name(mut self, port_name: impl Into<String>) -> Self {
        self.port_name = Some(port_name.into());
        self
    }
}

/// Outcome of one command exchange.
///
/// The display form is the text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The controller answered with this (trimmed) line.
    Reply(String),
    /// Written, but nothing was waiting after the reply wait.
    NoReply,
    /// No port could be opened; nothing was written.
    ConnectionFailed,
    /// Write or read failed; the connection was dropped.
    Failed(String),
}

impl Exchange {
    /// Whether the exchange got as far as the wire.
    pub fn reached_device(&self) -> bool {
        !matches!(self, Self::ConnectionFailed)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply(reply) => f.write_str(reply),
            Self::NoReply => f.write_str(NO_RESPONSE),
            Self::ConnectionFailed => f.write_str(CONNECTION_FAILED),
            Self::Failed(e) => write!(f, "Error: {e}"),
        }
    }
}

/// Owner of the single serial connection.
pub struct DeviceLink<B> {
    backend: B,
    config: LinkConfig,
    port: Option<Box<dyn Port>>,
}

impl<B: SerialBackend> DeviceLink<B> {
    /// Create a disconnected link.
    pub fn new(backend: B, config: LinkConfig) -> Self {
        Self {
            backend,
            config,
            port: None,
        }
    }

    /// Whether a port is currently open.
    pub fn is_connected(&self) -> bool {
        self.port
            .is_some()
    }

    /// Name of the open port, if any.
    pub fn port_name(&self) -> Option<&str> {
        self.port
            .as_deref()
            .map(|p| p.name())
    }

    /// (Re)connect, closing any open port first.
    ///
    /// On success returns the name of the opened port, after the settle delay.
    pub fn connect(&mut self) -> Result<String> {
        self.disconnect();

        let port_name = match self
            .config
            .port_name
        {
            Some(ref name) => name.clone(),
            None => match find_arduino_port(&self.backend) {
                Some(port) => port.name,
                None => {
                    warn!("Arduino not found!");
                    return Err(Error::DeviceNotFound);
                },
            },
        };

        let serial = SerialConfig::new(&port_name, self.config.baud_rate)
            .with_timeout(self.config.read_timeout);
        let port = self
            .backend
            .open(&serial)
            .inspect_err(|e| error!("Error connecting to Arduino: {e}"))?;

        thread::sleep(self.config.settle_delay);
        info!("Connected to Arduino on {port_name}");
        self.port = Some(port);

        Ok(port_name)
    }

    /// Close the open port, if any. Close errors are logged.
    pub fn disconnect(&mut self) {
        if let Some(mut port) = self
            .port
            .take()
        {
            match port.close() {
                Ok(()) => info!("Closed existing connection"),
                Err(e) => warn!("Error closing {}: {e}", port.name()),
            }
        }
    }

    /// Send one command, connecting first if needed.
    ///
    /// Never retries: after a failure the connection is gone and the next call
    /// starts from a fresh connect.
    pub fn send_command(&mut self, command: Command) -> Exchange {
        if self
            .port
            .is_none()
            && self
                .connect()
                .is_err()
        {
            return Exchange::ConnectionFailed;
        }
        let Some(port) = self
            .port
            .as_deref_mut()
        else {
            return Exchange::ConnectionFailed;
        };

        match exchange(port, command, &self.config) {
            Ok(Some(reply)) => {
                info!("Arduino response: {reply}");
                Exchange::Reply(reply)
            },
            Ok(None) => Exchange::NoReply,
            Err(e) => {
                error!("Error sending command: {e}");
                self.port = None;
                Exchange::Failed(e.to_string())
            },
        }
    }
}

fn exchange(port: &mut dyn Port, command: Command, config: &LinkConfig) -> Result<Option<String>> {
    port.write_all_bytes(&command.to_wire())?;
    info!("Sent command: {command}");

    thread::sleep(config.reply_wait);
    if port.bytes_to_read()? == 0 {
        return Ok(None);
    }
    read_line(port, Instant::now() + config.read_timeout).map(Some)
}

/// Read up to and including `\n`.
///
/// Stops early at EOF, a read timeout, `deadline` or [`MAX_REPLY_LEN`] bytes,
/// so a peer that never sends a newline cannot hold the link.
fn read_line(port: &mut dyn Port, deadline: Instant) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while line.len() < MAX_REPLY_LEN {
        if Instant::now() >= deadline {
            warn!("Reply line not terminated within the read timeout");
            break;
        }
        match port.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            },
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) => return Err(e.into()),
        }
    }

    Ok(String::from_utf8(line)?
        .trim()
        .to_string())
}
