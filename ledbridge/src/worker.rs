//! Single-owner device worker.
//!
//! The [`DeviceLink`] and the [`LedState`] live on one dedicated thread.
//! Requests arrive over a bounded queue and are handled strictly one at a time,
//! so concurrent HTTP requests never interleave writes and reads on the port.
//! The link blocks (settle delay, reply wait, read timeout); only this thread
//! pays for it.

use std::thread;

use log::debug;
use tokio::sync::{mpsc, oneshot};

use crate::{
    command::Command,
    error::{Error, Result},
    link::{DeviceLink, Exchange},
    port::SerialBackend,
    state::{LedSnapshot, LedState},
};

/// Pending requests before senders wait.
const QUEUE_DEPTH: usize = 16;

/// Result of asking the worker to make sure a connection exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A port was already open; nothing was done.
    AlreadyConnected,
    /// A new connection was opened on this port.
    Connected(String),
    /// Connecting failed.
    Failed(String),
}

/// Result of dispatching one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// The command that was dispatched.
    pub command: Command,
    /// What the exchange produced.
    pub outcome: Exchange,
    /// LED state right after the dispatch.
    pub led_states: LedSnapshot,
}

/// Connection flag plus LED state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LinkStatus {
    /// Whether a port is open.
    pub connected: bool,
    /// Last-commanded LED state.
    pub led_states: LedSnapshot,
}

enum Request {
    EnsureConnected(oneshot::Sender<ConnectOutcome>),
    Dispatch(Command, oneshot::Sender<Dispatched>),
    Status(oneshot::Sender<LinkStatus>),
}

/// Cloneable handle to the device worker.
///
/// The worker exits, closing the port, once every handle is dropped.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tx: mpsc::Sender<Request>,
}

impl LinkHandle {
    /// Move `link` onto a new worker thread.
    pub fn spawn<B>(link: DeviceLink<B>) -> Result<Self>
    where
        B: SerialBackend + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        thread::Builder::new()
            .name("device-link".to_string())
            .spawn(move || run(link, rx))?;
        Ok(Self { tx })
    }

    /// Connect unless a port is already open.
    pub async fn ensure_connected(&self) -> Result<ConnectOutcome> {
        self.request(Request::EnsureConnected)
            .await
    }

    /// Send a command and record it in the LED state.
    pub async fn dispatch(&self, command: Command) -> Result<Dispatched> {
        self.request(|reply| Request::Dispatch(command, reply))
            .await
    }

    /// Connection flag and LED state. Performs no device I/O.
    pub async fn status(&self) -> Result<LinkStatus> {
        self.request(Request::Status)
            .await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::WorkerStopped)?;
        reply_rx
            .await
            .map_err(|_| Error::WorkerStopped)
    }
}

fn run<B: SerialBackend>(mut link: DeviceLink<B>, mut rx: mpsc::Receiver<Request>) {
    let mut leds = LedState::new();

    while let Some(request) = rx.blocking_recv() {
        match request {
            Request::EnsureConnected(reply) => {
                let outcome = if link.is_connected() {
                    ConnectOutcome::AlreadyConnected
                } else {
                    match link.connect() {
                        Ok(port) => ConnectOutcome::Connected(port),
                        Err(e) => ConnectOutcome::Failed(e.to_string()),
                    }
                };
                let _ = reply.send(outcome);
            },
            Request::Dispatch(command, reply) => {
                let outcome = link.send_command(command);
                // Optimistic: recorded whether or not the controller acknowledged
                if outcome.reached_device() {
                    leds.update(command);
                }
                let _ = reply.send(Dispatched {
                    command,
                    outcome,
                    led_states: leds.snapshot(),
                });
            },
            Request::Status(reply) => {
                let _ = reply.send(LinkStatus {
                    connected: link.is_connected(),
                    led_states: leds.snapshot(),
                });
            },
        }
    }

    link.disconnect();
    debug!("Device worker exiting");
}
