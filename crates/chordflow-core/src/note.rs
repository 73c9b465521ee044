//! Single pitch value: name, pitch class, octave, MIDI number, frequency.
//!
//! A [`Note`] is an immutable wrapper around a MIDI note number. Values
//! above 127 lie outside the standard MIDI range; they construct fine but
//! are logged and flagged via [`Note::is_standard_range`]. Ordering,
//! equality, and hashing are defined solely by the MIDI number; name,
//! pitch class, and octave are derived on demand.
//!
//! MIDI 12 is C0, so `midi == (octave + 1) * 12 + pitch_class`.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::{Error, Result};

/// Sharp spellings for the twelve pitch classes, starting at C.
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single note, identified by its MIDI number.
///
/// Notes are named in scientific pitch notation: letter, optional
/// accidental (`#` or `b`), octave. Flat spellings are normalized to the
/// equivalent sharp one pitch class below (`Db4` == `C#4`, `Cb4` == `B3`).
///
/// Middle C (MIDI 60) is `C4`. Concert A (440 Hz, MIDI 69) is `A4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note {
    midi: u8,
}

impl Note {
    pub const MIDDLE_C: Note = Note { midi: 60 };
    pub const CONCERT_A: Note = Note { midi: 69 };

    /// Builds a note from a raw MIDI number.
    ///
    /// Values above 127 are outside the standard MIDI range but still
    /// constructible; they are logged and flagged by
    /// [`Note::is_standard_range`].
    pub fn from_midi(midi: u8) -> Note {
        if midi > 127 {
            warn!(midi, "note outside the standard MIDI range 0..=127");
        }
        Note { midi }
    }

    /// Builds a note from a name (`"C#"`, `"Bb"`, `"A"`) and an octave.
    ///
    /// Flats normalize to the sharp spelling one pitch class below; the
    /// wrap past C decrements the octave (`Cb4` == `B3`).
    pub fn from_name_octave(name: &str, octave: i8) -> Result<Note> {
        let (pitch_class, octave) = parse_name(name, octave)?;
        let midi = (octave as i32 + 1) * 12 + pitch_class as i32;
        if !(0..=255).contains(&midi) {
            return Err(Error::MidiOutOfRange(midi));
        }
        Ok(Note::from_midi(midi as u8))
    }

    /// Parses scientific pitch notation, e.g. `"C#4"`, `"Bb3"`, `"A-1"`.
    pub fn parse(s: &str) -> Result<Note> {
        let split = s
            .char_indices()
            .find(|&(i, c)| c.is_ascii_digit() || (c == '-' && i > 0))
            .map(|(i, _)| i)
            .ok_or_else(|| Error::InvalidNoteName(s.to_string()))?;
        let (name, octave_str) = s.split_at(split);
        if name.is_empty() {
            return Err(Error::InvalidNoteName(s.to_string()));
        }
        let octave: i8 = octave_str
            .parse()
            .map_err(|_| Error::InvalidNoteName(s.to_string()))?;
        Self::from_name_octave(name, octave)
    }

    pub const fn midi(self) -> u8 {
        self.midi
    }

    /// True for the standard MIDI range 0..=127.
    pub const fn is_standard_range(self) -> bool {
        self.midi <= 127
    }

    /// 0-11, where 0 = C.
    pub const fn pitch_class(self) -> u8 {
        self.midi % 12
    }

    /// Returns -1 to 9.
    pub const fn octave(self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Sharp spelling of the pitch class, e.g. `"C#"`.
    pub fn name(self) -> &'static str {
        PITCH_CLASS_NAMES[self.pitch_class() as usize]
    }

    /// Frequency in Hz (A4 = 440 Hz, equal temperament).
    pub fn frequency(self) -> f64 {
        440.0 * 2.0_f64.powf((self.midi as f64 - 69.0) / 12.0)
    }

    /// Returns `Err` if the result is not representable as a MIDI number.
    pub fn transpose(self, semitones: i16) -> Result<Note> {
        let midi = self.midi as i32 + semitones as i32;
        if !(0..=255).contains(&midi) {
            return Err(Error::MidiOutOfRange(midi));
        }
        Ok(Note::from_midi(midi as u8))
    }
}

/// Resolves a note name to its pitch class, normalizing flats and
/// adjusting the octave on underflow past C.
fn parse_name(name: &str, octave: i8) -> Result<(u8, i8)> {
    let mut chars = name.chars();
    let letter = chars
        .next()
        .ok_or_else(|| Error::InvalidNoteName(name.to_string()))?
        .to_ascii_uppercase();
    let accidental = chars.next();
    if chars.next().is_some() {
        return Err(Error::InvalidNoteName(name.to_string()));
    }

    let natural = match letter {
        'C' => 0i8,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(Error::InvalidNoteName(name.to_string())),
    };

    match accidental {
        None => Ok((natural as u8, octave)),
        Some('#') => {
            let pc = natural + 1;
            if pc == 12 {
                // B# wraps to C in the octave above
                Ok((0, octave + 1))
            } else {
                Ok((pc as u8, octave))
            }
        }
        Some('b') => {
            let pc = natural - 1;
            if pc < 0 {
                // Cb wraps to B in the octave below
                Ok((11, octave - 1))
            } else {
                Ok((pc as u8, octave))
            }
        }
        Some(_) => Err(Error::InvalidNoteName(name.to_string())),
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave())
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Note> {
        Note::parse(s)
    }
}

impl From<u8> for Note {
    fn from(midi: u8) -> Note {
        Note::from_midi(midi)
    }
}

impl From<Note> for u8 {
    fn from(note: Note) -> u8 {
        note.midi()
    }
}
