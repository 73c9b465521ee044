//! Music-theory data model for the chordflow event engine.
//!
//! Provides the pattern value types matched by the event loop in
//! `chordflow-io`:
//!
//! - [`Note`] - immutable pitch value keyed by MIDI number
//! - [`NoteList`] - ordered note container with bounded-depth flattening
//!   construction ([`NoteInput`])
//! - [`Chord`] - order-insensitive multiset of notes with interval-pattern
//!   identification against the embedded named-chord table
//! - [`Sequence`] - order-sensitive, length-bounded note run matched
//!   against a trailing history window
//! - [`ChordProgression`] - ordered chords matched as an end-pinned,
//!   non-contiguous subsequence of chord history

pub mod error;
pub use error::{Error, Result};

mod note;
pub use note::Note;

mod note_list;
pub use note_list::{NoteInput, NoteList, MAX_DEPTH};

mod chord;
pub use chord::{chord_shapes, Chord, ChordShape};

mod sequence;
pub use sequence::Sequence;

mod progression;
pub use progression::ChordProgression;
