//! Ordered chord progression matched as an end-pinned subsequence.

use std::collections::VecDeque;

use crate::chord::Chord;
use crate::error::{Error, Result};

/// Ordered tuple of chord patterns, bounded by
/// [`ChordProgression::MAX_LEN`].
///
/// The event loop snapshots one chord per key-down, so a played C4 major
/// triad leaves `[C4]`, `[C4 E4]`, `[C4 E4 G4]` in the history. Matching
/// therefore walks the progression through the history as an
/// order-preserving, non-contiguous subsequence that must consume the
/// final history entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChordProgression {
    chords: Vec<Chord>,
}

impl ChordProgression {
    /// Longest supported progression, which is also the capacity of the
    /// event loop's recent-chords window.
    pub const MAX_LEN: usize = 32;

    pub fn new(chords: Vec<Chord>) -> Result<Self> {
        if chords.len() > Self::MAX_LEN {
            return Err(Error::ProgressionTooLong(chords.len(), Self::MAX_LEN));
        }
        Ok(Self { chords })
    }

    /// Builds a progression from chord identifiers, e.g.
    /// `["C4 Major", "F4 Major", "G4 Major"]`.
    pub fn from_idents<'a>(idents: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let chords = idents
            .into_iter()
            .map(Chord::from_ident)
            .collect::<Result<Vec<_>>>()?;
        Self::new(chords)
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// True iff this progression's chords appear in order within
    /// `history` (oldest first, gaps allowed) and the final progression
    /// chord consumes the very last history entry.
    pub fn matches(&self, history: &VecDeque<Chord>) -> bool {
        if self.chords.is_empty() || self.chords.len() > history.len() {
            return false;
        }
        let mut cursor = history.iter();
        for chord in &self.chords {
            loop {
                match cursor.next() {
                    Some(entry) if entry == chord => break,
                    Some(_) => continue,
                    None => return false,
                }
            }
        }
        // Anything left after the final match means the most recent chord
        // is not the one we matched
        cursor.next().is_none()
    }
}

impl std::fmt::Display for ChordProgression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChordProgression(")?;
        for (i, chord) in self.chords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{chord}")?;
        }
        write!(f, ")")
    }
}
