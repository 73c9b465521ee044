//! Pattern keys and the handler registry.
//!
//! The three pattern families have different equality semantics over the
//! same underlying note data, so they are registered under one tagged
//! [`Pattern`] key whose derived `Eq`/`Hash` delegate to each family's
//! own implementation. The registry maps patterns to ordered callback
//! lists; registration order within a key is preserved.

use std::collections::HashMap;
use std::sync::Arc;

use chordflow_core::{Chord, ChordProgression, Sequence};

use crate::error::Result;

/// Callback invoked on pattern match. Dispatched fire-and-forget on its
/// own thread; panics are isolated and reported, never propagated.
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Tagged pattern key carrying its family's equality and hash semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Chord(Chord),
    Sequence(Sequence),
    Progression(ChordProgression),
}

impl Pattern {
    /// Resolves a chord identifier such as `"C4 Major"` to a chord
    /// pattern.
    pub fn from_ident(ident: &str) -> Result<Self> {
        Ok(Pattern::Chord(Chord::from_ident(ident)?))
    }

    pub fn family(&self) -> PatternFamily {
        match self {
            Pattern::Chord(_) => PatternFamily::Chord,
            Pattern::Sequence(_) => PatternFamily::Sequence,
            Pattern::Progression(_) => PatternFamily::Progression,
        }
    }
}

impl From<Chord> for Pattern {
    fn from(chord: Chord) -> Self {
        Pattern::Chord(chord)
    }
}

impl From<Sequence> for Pattern {
    fn from(seq: Sequence) -> Self {
        Pattern::Sequence(seq)
    }
}

impl From<ChordProgression> for Pattern {
    fn from(prog: ChordProgression) -> Self {
        Pattern::Progression(prog)
    }
}

/// One of the three pattern families, for family-wide operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    Chord,
    Sequence,
    Progression,
}

/// Opaque handle to a registered handler, usable for removal. Ids are
/// assigned monotonically, so their order is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    entries: HashMap<Pattern, Vec<(HandlerId, Callback)>>,
    next_id: u64,
}

impl HandlerRegistry {
    pub(crate) fn add(&mut self, pattern: Pattern, callback: Callback) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.entry(pattern).or_default().push((id, callback));
        id
    }

    /// Removes a single handler by id. Returns false if the id is gone.
    pub(crate) fn remove(&mut self, id: HandlerId) -> bool {
        let mut removed = false;
        self.entries.retain(|_, list| {
            if let Some(pos) = list.iter().position(|(hid, _)| *hid == id) {
                list.remove(pos);
                removed = true;
            }
            !list.is_empty()
        });
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes every handler registered under `pattern`.
    pub(crate) fn clear_pattern(&mut self, pattern: &Pattern) -> bool {
        self.entries.remove(pattern).is_some()
    }

    /// Removes every handler whose key belongs to `family`, returning the
    /// number of keys dropped.
    pub(crate) fn clear_family(&mut self, family: PatternFamily) -> usize {
        let before = self.entries.len();
        self.entries.retain(|pattern, _| pattern.family() != family);
        before - self.entries.len()
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn patterns(&self) -> Vec<Pattern> {
        self.entries.keys().cloned().collect()
    }

    /// Callbacks registered for exactly this chord (multiset equality via
    /// the map lookup).
    pub(crate) fn chord_callbacks(&self, chord: &Chord) -> Vec<(HandlerId, Pattern, Callback)> {
        let key = Pattern::Chord(chord.clone());
        match self.entries.get(&key) {
            Some(list) => list
                .iter()
                .map(|(id, cb)| (*id, key.clone(), Arc::clone(cb)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Iterates all registered patterns with their callback lists.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Pattern, &Vec<(HandlerId, Callback)>)> {
        self.entries.iter()
    }
}
