//! Error types for the music-theory data model.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid note name: '{0}'")]
    InvalidNoteName(String),

    #[error("MIDI note {0} out of range 0..=127")]
    MidiOutOfRange(i32),

    #[error("note nesting exceeds maximum depth of {0}")]
    NestingTooDeep(usize),

    #[error("sequence of {0} notes exceeds maximum of {1}")]
    SequenceTooLong(usize, usize),

    #[error("progression of {0} chords exceeds maximum of {1}")]
    ProgressionTooLong(usize, usize),

    #[error("unknown chord name: '{0}'")]
    UnknownChord(String),

    #[error("invalid chord identifier: '{0}' (expected '<note> <chord name>')")]
    InvalidChordIdent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
