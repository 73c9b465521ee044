//! Transport abstraction over MIDI event sources.
//!
//! A [`Transport`] delivers note events in one of two modes: **push**
//! (the transport invokes an installed callback per message, as midir
//! does) or **poll** (the engine owns a drain loop and repeatedly asks
//! for pending messages). The event loop picks its operating mode from
//! [`Transport::delivery`] at construction.

mod loopback;
pub use loopback::LoopbackTransport;

#[cfg(feature = "midi-io")]
mod hardware;
#[cfg(feature = "midi-io")]
pub use hardware::{MidiInputTransport, PortInfo};

use crate::error::Result;

/// Note message kind. `NoteOn` with velocity 0 is treated as a key-up by
/// the engine, per the MIDI running-status convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOn,
    NoteOff,
}

/// A discrete note event from a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    pub kind: MessageKind,
    pub note: u8,
    pub velocity: u8,
}

impl MidiMessage {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Self {
            kind: MessageKind::NoteOn,
            note,
            velocity,
        }
    }

    pub fn note_off(note: u8) -> Self {
        Self {
            kind: MessageKind::NoteOff,
            note,
            velocity: 0,
        }
    }

    /// True for a note-on with non-zero velocity.
    pub fn is_key_down(&self) -> bool {
        self.kind == MessageKind::NoteOn && self.velocity > 0
    }

    /// Parses a raw MIDI message, returning `None` for anything other
    /// than note-on/note-off (CC, pitch bend, etc. are not note events).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }
        let note = bytes[1] & 0x7F;
        let velocity = bytes[2] & 0x7F;
        match bytes[0] & 0xF0 {
            0x90 => Some(Self::note_on(note, velocity)),
            0x80 => Some(Self::note_off(note)),
            _ => None,
        }
    }
}

/// Per-message callback installed on push transports.
pub type MessageCallback = Box<dyn FnMut(MidiMessage) + Send>;

/// How a transport hands messages to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Transport invokes the installed callback per message.
    Push,
    /// Engine drains pending messages from a background loop.
    Poll,
}

/// A source of note events bound to one event loop.
pub trait Transport: Send {
    fn delivery(&self) -> Delivery;

    /// Installs the per-message callback. Push transports must deliver
    /// every subsequent message (and any already queued) through it;
    /// poll transports return [`Error::WrongDelivery`](crate::Error).
    fn set_callback(&mut self, callback: MessageCallback) -> Result<()>;

    /// Returns all currently pending messages without blocking. Push
    /// transports have nothing to drain and return an empty vec.
    fn drain_pending(&mut self) -> Vec<MidiMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_note_on() {
        let msg = MidiMessage::from_bytes(&[0x90, 60, 100]).unwrap();
        assert_eq!(msg, MidiMessage::note_on(60, 100));
        assert!(msg.is_key_down());
    }

    #[test]
    fn test_from_bytes_note_off() {
        let msg = MidiMessage::from_bytes(&[0x80, 60, 0]).unwrap();
        assert_eq!(msg, MidiMessage::note_off(60));
        assert!(!msg.is_key_down());
    }

    #[test]
    fn test_note_on_velocity_zero_is_key_up() {
        let msg = MidiMessage::from_bytes(&[0x90, 64, 0]).unwrap();
        assert_eq!(msg.kind, MessageKind::NoteOn);
        assert!(!msg.is_key_down());
    }

    #[test]
    fn test_from_bytes_ignores_other_status() {
        assert!(MidiMessage::from_bytes(&[0xB0, 7, 127]).is_none()); // CC
        assert!(MidiMessage::from_bytes(&[0xE0, 0, 64]).is_none()); // pitch bend
        assert!(MidiMessage::from_bytes(&[0x90, 60]).is_none()); // truncated
        assert!(MidiMessage::from_bytes(&[]).is_none());
    }

    #[test]
    fn test_from_bytes_any_channel() {
        let msg = MidiMessage::from_bytes(&[0x95, 60, 80]).unwrap();
        assert_eq!(msg, MidiMessage::note_on(60, 80));
    }
}
