//! Order-insensitive chord pattern with interval identification.
//!
//! A [`Chord`] canonicalizes its notes ascending by MIDI number, so the
//! derived equality and hash give multiset semantics: the same notes with
//! the same multiplicities compare equal regardless of press order, and
//! duplicate counts matter.
//!
//! Identification compares the chord's semitone pattern (offsets from the
//! lowest note) against an embedded table of named shapes, each with one
//! or more interval variants.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::note::Note;
use crate::note_list::{NoteInput, NoteList};

/// Named chord shape: one or more semitone-offset variants, offsets
/// relative to the lowest note, first offset always 0.
#[derive(Debug, Clone, Deserialize)]
pub struct ChordShape {
    pub name: String,
    pub semitones: Vec<Vec<u8>>,
}

#[derive(Deserialize)]
struct ShapeTable {
    chords: Vec<ChordShape>,
}

static SHAPES: OnceLock<Vec<ChordShape>> = OnceLock::new();

/// The static named-chord table, loaded once and never mutated.
pub fn chord_shapes() -> &'static [ChordShape] {
    SHAPES
        .get_or_init(|| {
            let table: ShapeTable = serde_json::from_str(include_str!("chords.json"))
                .expect("embedded chords.json is well-formed");
            table.chords
        })
        .as_slice()
}

/// Notes sorted ascending by MIDI number, compared as a multiset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    notes: NoteList,
}

impl Chord {
    /// Canonicalizes the given notes by sorting ascending.
    pub fn new(notes: impl Into<NoteList>) -> Self {
        let mut notes = notes.into();
        notes.sort();
        Self { notes }
    }

    pub fn from_input(input: impl Into<NoteInput>) -> Result<Self> {
        Ok(Self::new(NoteList::from_input(input)?))
    }

    /// Parses space- or comma-separated ASCII notes, e.g. `"C4 E4 G4"`.
    pub fn from_ascii(s: &str) -> Result<Self> {
        Ok(Self::new(NoteList::from_ascii(s)?))
    }

    /// Builds a chord from raw MIDI numbers.
    pub fn from_midi(midi: &[u8]) -> Self {
        Self::new(NoteList::from_midi(midi))
    }

    /// Builds a chord from a root note and a shape name from the table,
    /// using the first listed interval variant.
    pub fn from_note_chord(root: Note, chord_name: &str) -> Result<Self> {
        let variant = first_variant(chord_name)?;
        let notes = variant
            .iter()
            .map(|&offset| root.transpose(offset as i16))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(notes))
    }

    /// Builds a chord from an identifier as produced by [`Chord::identify`],
    /// e.g. `"A4 Major"` or `"C4 Harmonic seventh"`.
    pub fn from_ident(ident: &str) -> Result<Self> {
        let trimmed = ident.trim();
        let (base, name) = trimmed
            .split_once(' ')
            .ok_or_else(|| Error::InvalidChordIdent(ident.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidChordIdent(ident.to_string()));
        }
        Self::from_note_chord(Note::parse(base)?, name)
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

    /// Lowest note of the chord, if any.
    pub fn root(&self) -> Option<Note> {
        self.notes.notes().first().copied()
    }

    /// Semitone offsets from the lowest note; the first entry is always 0.
    pub fn semitones(&self) -> Vec<u8> {
        match self.root() {
            Some(root) => self
                .notes
                .iter()
                .map(|n| n.midi() - root.midi())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns every matching `"<lowest note> <shape name>"` from the
    /// static table. Shapes share spellings, so zero, one, or several
    /// names may match.
    pub fn identify(&self) -> Vec<String> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let pattern = self.semitones();
        let mut names = Vec::new();
        for shape in chord_shapes() {
            for variant in &shape.semitones {
                if pattern == *variant {
                    names.push(format!("{root} {}", shape.name));
                }
            }
        }
        tracing::debug!(chord = %self, matches = names.len(), "identify");
        names
    }
}

fn first_variant(chord_name: &str) -> Result<&'static [u8]> {
    chord_shapes()
        .iter()
        .find(|shape| shape.name == chord_name)
        .map(|shape| shape.semitones[0].as_slice())
        .ok_or_else(|| Error::UnknownChord(chord_name.to_string()))
}

impl From<Vec<Note>> for Chord {
    fn from(notes: Vec<Note>) -> Self {
        Self::new(notes)
    }
}

impl std::fmt::Display for Chord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chord({})", self.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_press_order() {
        let a = Chord::from_ascii("A4 C#5 E5").unwrap();
        let b = Chord::from_ascii("C#5 A4 E5").unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_equality_is_multiplicity_sensitive() {
        let doubled = Chord::from_ascii("A4 A4 C#5").unwrap();
        let plain = Chord::from_ascii("A4 C#5").unwrap();
        assert_ne!(doubled, plain);
    }

    #[test]
    fn test_length_mismatch() {
        let triad = Chord::from_midi(&[69, 73, 76]);
        let tetrad = Chord::from_midi(&[69, 73, 76, 100]);
        assert_ne!(triad, tetrad);
    }

    #[test]
    fn test_semitones() {
        let chord = Chord::from_ident("A4 Major").unwrap();
        assert_eq!(chord.semitones(), vec![0, 4, 7]);
        assert!(Chord::new(Vec::new()).semitones().is_empty());
    }

    #[test]
    fn test_identify_major() {
        let chord = Chord::from_ascii("A4 C#5 E5").unwrap();
        let names = chord.identify();
        assert!(names.contains(&"A4 Major".to_string()), "got {names:?}");
    }

    #[test]
    fn test_identify_returns_all_matches() {
        // [0, 4, 7, 10] is both a dominant and a harmonic seventh
        let chord = Chord::from_note_chord(Note::parse("C4").unwrap(), "Dominant seventh").unwrap();
        let names = chord.identify();
        assert!(names.contains(&"C4 Dominant seventh".to_string()));
        assert!(names.contains(&"C4 Harmonic seventh".to_string()));
    }

    #[test]
    fn test_identify_empty_chord() {
        assert!(Chord::new(Vec::new()).identify().is_empty());
    }

    #[test]
    fn test_from_ident() {
        let by_ident = Chord::from_ident("A4 Major").unwrap();
        let by_notes = Chord::from_ascii("A4 C#5 E5").unwrap();
        assert_eq!(by_ident, by_notes);
    }

    #[test]
    fn test_from_ident_multi_word_name() {
        let chord = Chord::from_ident("C4 Harmonic seventh").unwrap();
        assert_eq!(chord.semitones(), vec![0, 4, 7, 10]);
    }

    #[test]
    fn test_from_ident_rejects_missing_name() {
        assert!(matches!(
            Chord::from_ident("A4"),
            Err(Error::InvalidChordIdent(_))
        ));
        assert!(Chord::from_ident("").is_err());
    }

    #[test]
    fn test_from_ident_unknown_chord() {
        assert!(matches!(
            Chord::from_ident("A4 Nonexistent"),
            Err(Error::UnknownChord(_))
        ));
    }

    #[test]
    fn test_from_note_chord_uses_first_variant() {
        // Augmented sixth has several realizations; the first listed wins
        let chord =
            Chord::from_note_chord(Note::parse("C4").unwrap(), "Augmented sixth").unwrap();
        assert_eq!(chord.semitones(), vec![0, 6, 10]);
    }

    #[test]
    fn test_from_note_chord_out_of_range() {
        // 250 + 7 semitones leaves the representable range entirely
        let high = Note::from_midi(250);
        assert!(Chord::from_note_chord(high, "Major").is_err());
    }

    #[test]
    fn test_shape_table_well_formed() {
        let shapes = chord_shapes();
        assert!(!shapes.is_empty());
        for shape in shapes {
            assert!(!shape.semitones.is_empty(), "{} has no variants", shape.name);
            for variant in &shape.semitones {
                assert_eq!(variant[0], 0, "{} variant must start at 0", shape.name);
            }
        }
    }
}
