//! Scripted serial backend for tests.
//!
//! [`ScriptedDevice`] plays the controller: it lists a fixed set of ports,
//! records every byte written, and queues a canned reply after each complete
//! command line. Clones share the same script, so a test can keep one clone
//! for assertions while the link owns another.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    error::{Error, Result},
    port::{Port, PortInfo, SerialBackend, SerialConfig},
};

#[derive(Debug, Default)]
struct Script {
    ports: Vec<PortInfo>,
    reply: Option<Vec<u8>>,
    fail_open: bool,
    fail_writes: bool,
    written: Vec<u8>,
    pending: VecDeque<u8>,
    opens: Vec<SerialConfig>,
    closes: usize,
}

/// A fake controller behind a fake serial backend.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDevice {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedDevice {
    /// A host with exactly these ports and a silent device.
    pub fn new(ports: Vec<PortInfo>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                ports,
                ..Script::default()
            })),
        }
    }

    /// A host with one Arduino on `COM5` that never replies.
    pub fn arduino() -> Self {
        Self::new(vec![PortInfo::new("COM5", "USB Serial Port (COM5)")])
    }

    /// A host with no serial ports at all.
    pub fn absent() -> Self {
        Self::new(Vec::new())
    }

    /// Reply with `text` after every command line.
    #[must_use]
    pub fn with_reply(self, text: &str) -> Self {
        self.with_reply_bytes(text.as_bytes().to_vec())
    }

    /// Reply with raw bytes after every command line.
    #[must_use]
    pub fn with_reply_bytes(self, bytes: Vec<u8>) -> Self {
        self.script().reply = Some(bytes);
        self
    }

    /// Make every subsequent open fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.script().fail_open = fail;
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.script().fail_writes = fail;
    }

    /// Complete lines written so far, without their newlines.
    pub fn written_lines(&self) -> Vec<String> {
        let script = self.script();
        let text = String::from_utf8_lossy(&script.written);
        text.split_terminator('\n')
            .map(str::to_string)
            .collect()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.script()
            .opens
            .len()
    }

    /// Configuration of the most recent successful open.
    pub fn last_open(&self) -> Option<SerialConfig> {
        self.script()
            .opens
            .last()
            .cloned()
    }

    /// Number of explicit closes.
    pub fn close_count(&self) -> usize {
        self.script().closes
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SerialBackend for ScriptedDevice {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self
            .script()
            .ports
            .clone())
    }

    fn open(&self, config: &SerialConfig) -> Result<Box<dyn Port>> {
        let mut script = self.script();
        if script.fail_open {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot open {}", config.port_name),
            )));
        }
        script
            .opens
            .push(config.clone());

        Ok(Box::new(ScriptedPort {
            device: self.clone(),
            name: config
                .port_name
                .clone(),
        }))
    }
}

/// Port handed out by [`ScriptedDevice`].
#[derive(Debug)]
pub struct ScriptedPort {
    device: ScriptedDevice,
    name: String,
}

impl Port for ScriptedPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<u32> {
        let pending = self
            .device
            .script()
            .pending
            .len();
        Ok(u32::try_from(pending).unwrap_or(u32::MAX))
    }

    fn close(&mut self) -> Result<()> {
        self.device
            .script()
            .closes += 1;
        Ok(())
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut script = self.device.script();
        match script
            .pending
            .pop_front()
        {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            },
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
        }
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.device.script();
        if script.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }

        script
            .written
            .extend_from_slice(buf);
        let lines = buf
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        if let Some(reply) = script
            .reply
            .clone()
        {
            for _ in 0..lines {
                script
                    .pending
                    .extend(reply.iter().copied());
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
