//! MIDI transports and the chordflow event loop.
//!
//! Connects a note-event source ([`Transport`]) to the pattern types from
//! `chordflow-core`: the [`EventLoop`] tracks held keys plus bounded
//! recent-note and recent-chord windows, and dispatches registered
//! handlers whenever the key state matches a [`Pattern`].
//!
//! ## Quick start
//!
//! ```
//! use chordflow_io::{EventLoop, LoopbackTransport};
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
//! # Ok::<(), chordflow_io::Error>(())
//! ```
//!
//! Hardware input requires the `midi-io` feature:
//!
//! ```ignore
//! use chordflow_io::{EventLoop, MidiInputTransport};
//!
//! let transport = MidiInputTransport::open_first()?;
//! let engine = EventLoop::new(transport)?;
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod transport;
pub use transport::{Delivery, LoopbackTransport, MessageKind, MidiMessage, Transport};

#[cfg(feature = "midi-io")]
pub use transport::{MidiInputTransport, PortInfo};

mod pattern;
pub use pattern::{Callback, HandlerId, Pattern, PatternFamily};

mod engine;
pub use engine::{EventLoop, HandlerPanic, StopHandle};
