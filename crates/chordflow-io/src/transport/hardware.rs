//! Hardware MIDI input via midir.
//!
//! Requires the `midi-io` feature. midir delivers messages on its own
//! callback thread, so this transport is push-only.

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use tracing::debug;

use super::{Delivery, MessageCallback, MidiMessage, Transport};
use crate::error::{Error, Result};

const CLIENT_NAME: &str = "chordflow-input";

/// An available MIDI input port.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

enum State {
    /// Port selected, waiting for the engine to install its callback.
    Pending(Box<MidiInput>, MidiInputPort),
    /// Connected and delivering.
    Connected(MidiInputConnection<()>),
    /// Closed (or poisoned by a failed connect).
    Closed,
}

/// Push transport over a hardware (or virtual system) MIDI input port.
pub struct MidiInputTransport {
    port_name: String,
    state: State,
}

impl MidiInputTransport {
    /// Enumerates available input ports.
    pub fn list_ports() -> Result<Vec<PortInfo>> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        let mut ports = Vec::new();
        for (index, port) in midi_in.ports().iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown device {index}"));
            ports.push(PortInfo { index, name });
        }
        Ok(ports)
    }

    /// Opens the first available input port. Fails with
    /// [`Error::NoPortsFound`] when none are discoverable.
    pub fn open_first() -> Result<Self> {
        Self::open_by_index(0)
    }

    pub fn open_by_index(index: usize) -> Result<Self> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(Error::NoPortsFound);
        }
        let port = ports
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::PortNotFound(format!("index {index}")))?;
        Self::from_port(midi_in, port)
    }

    pub fn open_by_name(name: &str) -> Result<Self> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(Error::NoPortsFound);
        }
        let port = ports
            .into_iter()
            .find(|p| midi_in.port_name(p).is_ok_and(|n| n == name))
            .ok_or_else(|| Error::PortNotFound(name.to_string()))?;
        Self::from_port(midi_in, port)
    }

    fn from_port(midi_in: MidiInput, port: MidiInputPort) -> Result<Self> {
        let port_name = midi_in.port_name(&port)?;
        debug!(port = %port_name, "opened MIDI input port");
        Ok(Self {
            port_name,
            state: State::Pending(Box::new(midi_in), port),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Disconnects from the port. Dropping the transport has the same
    /// effect.
    pub fn close(&mut self) {
        if let State::Connected(conn) = std::mem::replace(&mut self.state, State::Closed) {
            conn.close();
            debug!(port = %self.port_name, "closed MIDI input port");
        }
    }
}

impl Transport for MidiInputTransport {
    fn delivery(&self) -> Delivery {
        Delivery::Push
    }

    fn set_callback(&mut self, mut callback: MessageCallback) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Pending(midi_in, port) => {
                let connection = midi_in.connect(
                    &port,
                    CLIENT_NAME,
                    move |_timestamp, bytes, _| {
                        if let Some(msg) = MidiMessage::from_bytes(bytes) {
                            callback(msg);
                        } else {
                            debug!(?bytes, "ignoring non-note MIDI message");
                        }
                    },
                    (),
                )?;
                self.state = State::Connected(connection);
                Ok(())
            }
            State::Connected(conn) => {
                self.state = State::Connected(conn);
                Err(Error::Midi("callback already installed".to_string()))
            }
            State::Closed => Err(Error::Midi("transport is closed".to_string())),
        }
    }

    fn drain_pending(&mut self) -> Vec<MidiMessage> {
        Vec::new()
    }
}

impl Drop for MidiInputTransport {
    fn drop(&mut self) {
        self.close();
    }
}
