//! Shared ordered note container behind [`Chord`](crate::Chord) and
//! [`Sequence`](crate::Sequence).
//!
//! Construction accepts arbitrarily nested mixtures of notes and raw MIDI
//! numbers through [`NoteInput`], flattened up to a bounded depth. The two
//! pattern types own a `NoteList` each and apply their own canonical order
//! and equality on top of it.

use crate::error::{Error, Result};
use crate::note::Note;

/// Maximum nesting depth accepted by [`NoteList::from_input`].
pub const MAX_DEPTH: usize = 5;

/// Construction input: a note, a raw MIDI number, or a nested list of either.
#[derive(Debug, Clone)]
pub enum NoteInput {
    Note(Note),
    Midi(u8),
    List(Vec<NoteInput>),
}

impl From<Note> for NoteInput {
    fn from(note: Note) -> Self {
        NoteInput::Note(note)
    }
}

impl From<u8> for NoteInput {
    fn from(midi: u8) -> Self {
        NoteInput::Midi(midi)
    }
}

impl<T: Into<NoteInput>> From<Vec<T>> for NoteInput {
    fn from(items: Vec<T>) -> Self {
        NoteInput::List(items.into_iter().map(Into::into).collect())
    }
}

/// Immutable ordered sequence of notes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteList {
    notes: Vec<Note>,
}

impl NoteList {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    /// Flattens a [`NoteInput`] tree into a note list.
    ///
    /// Raw MIDI numbers are converted through [`Note::from_midi`]. Nesting
    /// deeper than [`MAX_DEPTH`] is a construction error.
    pub fn from_input(input: impl Into<NoteInput>) -> Result<Self> {
        let mut notes = Vec::new();
        flatten_into(input.into(), 0, &mut notes)?;
        Ok(Self { notes })
    }

    /// Parses space- or comma-separated ASCII notes, e.g. `"C4 E4 G4"`.
    pub fn from_ascii(s: &str) -> Result<Self> {
        let cleaned = s.replace(',', " ");
        let notes = cleaned
            .split_whitespace()
            .map(Note::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { notes })
    }

    /// Builds a note list from raw MIDI numbers.
    pub fn from_midi(midi: &[u8]) -> Self {
        let notes = midi.iter().map(|&m| Note::from_midi(m)).collect();
        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    /// Sorts the notes ascending by MIDI number in place.
    pub(crate) fn sort(&mut self) {
        self.notes.sort_unstable();
    }
}

fn flatten_into(input: NoteInput, depth: usize, out: &mut Vec<Note>) -> Result<()> {
    match input {
        NoteInput::Note(note) => out.push(note),
        NoteInput::Midi(midi) => out.push(Note::from_midi(midi)),
        NoteInput::List(items) => {
            if depth >= MAX_DEPTH {
                return Err(Error::NestingTooDeep(MAX_DEPTH));
            }
            for item in items {
                flatten_into(item, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

impl From<Vec<Note>> for NoteList {
    fn from(notes: Vec<Note>) -> Self {
        Self::new(notes)
    }
}

impl<'a> IntoIterator for &'a NoteList {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

impl PartialEq<[Note]> for NoteList {
    fn eq(&self, other: &[Note]) -> bool {
        self.notes == other
    }
}

impl std::fmt::Display for NoteList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for note in &self.notes {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{note}")?;
            first = false;
        }
        Ok(())
    }
}
