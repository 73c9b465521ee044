//! # chordflow - MIDI chord, sequence, and progression events
//!
//! Watches a live stream of note-on/note-off events and invokes user
//! callbacks when the evolving key state matches a registered pattern:
//!
//! - **Chord** - simultaneous notes, order-insensitive (multiset equality)
//! - **Sequence** - ordered note run matched against the trailing window
//!   of recent key-downs
//! - **ChordProgression** - ordered chords matched as an end-pinned,
//!   non-contiguous subsequence of the recent chord history
//!
//! ## Quick start
//!
//! ```
//! use chordflow::prelude::*;
//!
//! let transport = LoopbackTransport::push();
//! let keys = transport.clone();
//! let engine = EventLoop::new(transport)?;
//!
//! engine.add_handler_ident("C4 Major", || println!("C major!"))?;
//!
//! keys.send_note_on(60, 100);
//! keys.send_note_on(64, 100);
//! keys.send_note_on(67, 100); // handler fires here
//! # Ok::<(), chordflow::Error>(())
//! ```
//!
//! ## Feature flags
//!
//! - `midi-io` - hardware MIDI input via midir (adds
//!   [`MidiInputTransport`])

/// Re-export of chordflow-core for direct access
pub use chordflow_core as core;

/// Re-export of chordflow-io for direct access
pub use chordflow_io as io;

// Pattern data model
pub use chordflow_core::{chord_shapes, Chord, ChordProgression, ChordShape, Note, NoteInput, NoteList, Sequence};

// Transports and the event loop
pub use chordflow_io::{
    Delivery, Error, EventLoop, HandlerId, HandlerPanic, LoopbackTransport, MessageKind,
    MidiMessage, Pattern, PatternFamily, Result, StopHandle, Transport,
};

#[cfg(feature = "midi-io")]
pub use chordflow_io::{MidiInputTransport, PortInfo};

pub mod prelude {
    //! Common imports for building on chordflow.
    pub use crate::{
        Chord, ChordProgression, Delivery, EventLoop, LoopbackTransport, MidiMessage, Note,
        NoteList, Pattern, PatternFamily, Sequence, StopHandle, Transport,
    };

    #[cfg(feature = "midi-io")]
    pub use crate::MidiInputTransport;
}
