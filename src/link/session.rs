use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use strum_macros::Display;

use super::error::LinkError;
use super::framing::LineFramer;
use super::protocol::OutboundCommand;
use crate::coordinator::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Link state plus the human-readable reason for the last transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: LinkState,
    pub reason: String,
}

impl LinkStatus {
    fn new(state: LinkState, reason: &str) -> Self {
        Self {
            state,
            reason: reason.to_string(),
        }
    }
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self::new(LinkState::Disconnected, "Disconnected")
    }
}

/// The coordinator's view of the serial session. The production
/// implementation is [`LinkSession`]; tests record commands instead.
pub trait LinkControl {
    fn connect(&mut self, port: &str) -> Result<(), LinkError>;
    fn stop(&mut self);
    fn send(&mut self, command: &OutboundCommand);
    fn status(&self) -> LinkStatus;

    fn is_connected(&self) -> bool {
        self.status().state == LinkState::Connected
    }
}

/// One serial connection to the mount controller. Owns the writer half;
/// a reader thread reassembles telemetry lines and pushes them into the
/// coordinator's event queue.
pub struct LinkSession {
    baud: u32,
    timeout: Duration,
    events: Sender<Event>,
    status: Arc<Mutex<LinkStatus>>,
    running: Arc<AtomicBool>,
    writer: Option<Box<dyn SerialPort>>,
    reader: Option<JoinHandle<()>>,
}

impl LinkSession {
    pub fn new(baud: u32, timeout: Duration, events: Sender<Event>) -> Self {
        Self {
            baud,
            timeout,
            events,
            status: Arc::new(Mutex::new(LinkStatus::default())),
            running: Arc::new(AtomicBool::new(false)),
            writer: None,
            reader: None,
        }
    }

    fn set_status(&self, state: LinkState, reason: &str) {
        let status = LinkStatus::new(state, reason);
        *self.status.lock().unwrap() = status.clone();
        let _ = self.events.send(Event::Link(status));
    }
}

impl LinkControl for LinkSession {
    fn connect(&mut self, port: &str) -> Result<(), LinkError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(LinkError::AlreadyRunning);
        }

        self.set_status(LinkState::Connecting, "Connecting");

        let opened = serialport::new(port, self.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()
            .and_then(|writer| {
                let reader = writer.try_clone()?;
                Ok((writer, reader))
            });

        let (writer, reader) = match opened {
            Ok(pair) => pair,
            Err(e) => {
                self.set_status(LinkState::Disconnected, "Unable to open");
                return Err(LinkError::Open(e.to_string()));
            }
        };

        self.running.store(true, Ordering::SeqCst);
        self.writer = Some(writer);
        self.set_status(LinkState::Connected, "Connected");

        let running = self.running.clone();
        let events = self.events.clone();
        let status = self.status.clone();
        self.reader = Some(std::thread::spawn(move || {
            read_loop(reader, running, events, status);
        }));

        log::info!("serial link open on {port}");
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // The reader wakes within one read timeout; joining it guarantees
        // no telemetry event is emitted after stop() returns.
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        self.writer = None;
        if self.status.lock().unwrap().state != LinkState::Disconnected {
            self.set_status(LinkState::Disconnected, "Disconnected");
        }
    }

    fn send(&mut self, command: &OutboundCommand) {
        if !self.running.load(Ordering::SeqCst) {
            log::debug!("link not connected, dropping {command:?}");
            return;
        }
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.write_all(command.encode().as_bytes()) {
                log::warn!("serial write failed: {e}");
            }
        }
    }

    fn status(&self) -> LinkStatus {
        self.status.lock().unwrap().clone()
    }
}

impl Drop for LinkSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

fn read_loop<R: Read>(
    mut port: R,
    running: Arc<AtomicBool>,
    events: Sender<Event>,
    status: Arc<Mutex<LinkStatus>>,
) {
    let mut framer = LineFramer::new();
    let mut chunk = [0u8; 256];

    while running.load(Ordering::SeqCst) {
        match port.read(&mut chunk) {
            Ok(0) => continue,
            Ok(n) => {
                for line in framer.push(&chunk[..n]) {
                    if events.send(Event::LinkLine(line)).is_err() {
                        return;
                    }
                }
            }
            // A timeout with no data just means the mount is quiet.
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => {
                log::warn!("serial read failed: {e}");
                running.store(false, Ordering::SeqCst);
                let dropped = LinkStatus::new(LinkState::Disconnected, "Disconnected");
                *status.lock().unwrap() = dropped.clone();
                let _ = events.send(Event::Link(dropped));
                return;
            }
        }
    }
}
