//! Error types for transports and the event loop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] chordflow_core::Error),

    #[error("no MIDI input ports found")]
    NoPortsFound,

    #[error("MIDI port not found: {0}")]
    PortNotFound(String),

    #[error("MIDI device error: {0}")]
    Midi(String),

    #[error("key-up for note {0} which is not down (transport desync?)")]
    NoteNotDown(u8),

    #[error("{0} is not supported in {1:?} delivery mode")]
    WrongDelivery(&'static str, crate::transport::Delivery),

    #[error("event loop is already running")]
    AlreadyRunning,

    #[error("event loop is not running")]
    NotRunning,
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Midi(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Midi(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::Midi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
