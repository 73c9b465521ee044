//! Order-sensitive note pattern matched against a trailing history window.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::note::Note;
use crate::note_list::{NoteInput, NoteList};

/// Notes in insertion (press) order, bounded by [`Sequence::MAX_LEN`].
///
/// Equality is order-sensitive. Matching against play history compares the
/// history's trailing window of this sequence's length, so a short
/// sequence matches the end of a longer buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    notes: NoteList,
}

impl Sequence {
    /// Longest supported sequence, which is also the capacity of the
    /// event loop's recent-notes window.
    pub const MAX_LEN: usize = 16;

    pub fn new(notes: impl Into<NoteList>) -> Result<Self> {
        let notes = notes.into();
        if notes.len() > Self::MAX_LEN {
            return Err(Error::SequenceTooLong(notes.len(), Self::MAX_LEN));
        }
        Ok(Self { notes })
    }

    pub fn from_input(input: impl Into<NoteInput>) -> Result<Self> {
        Self::new(NoteList::from_input(input)?)
    }

    /// Parses space- or comma-separated ASCII notes, preserving order.
    pub fn from_ascii(s: &str) -> Result<Self> {
        Self::new(NoteList::from_ascii(s)?)
    }

    pub fn from_midi(midi: &[u8]) -> Result<Self> {
        Self::new(NoteList::from_midi(midi))
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.notes()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// True iff the trailing `self.len()` entries of `history` equal this
    /// sequence's notes in order. A buffer shorter than the sequence never
    /// matches; earlier history entries are ignored.
    pub fn matches_history(&self, history: &VecDeque<Note>) -> bool {
        let len = self.notes.len();
        if len == 0 || history.len() < len {
            return false;
        }
        history
            .iter()
            .skip(history.len() - len)
            .eq(self.notes.iter())
    }
}

impl PartialEq<NoteList> for Sequence {
    fn eq(&self, other: &NoteList) -> bool {
        self.notes == *other
    }
}

impl PartialEq<[Note]> for Sequence {
    fn eq(&self, other: &[Note]) -> bool {
        self.notes.notes() == other
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sequence({})", self.notes)
    }
}
