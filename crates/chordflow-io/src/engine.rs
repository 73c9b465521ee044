//! The event loop: consumes transport messages, maintains live and
//! historical key state, and dispatches matching pattern handlers.
//!
//! Message processing is single-threaded per loop instance: in push mode
//! it runs on the transport's callback thread, in poll mode on one
//! dedicated worker. Handler registration is guarded by a mutex so it is
//! safe from any thread while the loop is live.

use std::collections::{BTreeSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use chordflow_core::{Chord, ChordProgression, Note, Sequence};

use crate::error::{Error, Result};
use crate::pattern::{Callback, HandlerId, HandlerRegistry, Pattern, PatternFamily};
use crate::transport::{Delivery, MidiMessage, Transport};

/// How often the poll worker drains the transport between stop checks.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Report of a handler that panicked during dispatch.
#[derive(Debug, Clone)]
pub struct HandlerPanic {
    pub pattern: Pattern,
    pub message: String,
}

/// Detached stop signal for a poll-mode loop.
///
/// Obtained from [`EventLoop::stop_handle`] before starting; usable from
/// any thread, including a pattern handler, which is the only way to end
/// a blocking [`EventLoop::start`].
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    /// Signals the poll worker to exit. Idempotent; does not wait for the
    /// worker to finish.
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

struct EngineState {
    down_notes: BTreeSet<u8>,
    recent_notes: VecDeque<Note>,
    recent_chords: VecDeque<Chord>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            down_notes: BTreeSet::new(),
            recent_notes: VecDeque::with_capacity(Sequence::MAX_LEN),
            recent_chords: VecDeque::with_capacity(ChordProgression::MAX_LEN),
        }
    }
}

struct Shared {
    state: Mutex<EngineState>,
    registry: Mutex<HandlerRegistry>,
    panic_tx: Sender<HandlerPanic>,
}

impl Shared {
    /// Entry point for both delivery modes. Errors are surfaced on the
    /// log and never terminate the message-processing thread.
    fn handle_message(&self, msg: MidiMessage) {
        if let Err(e) = self.process_message(msg) {
            error!(note = msg.note, "message rejected: {e}");
        }
    }

    fn process_message(&self, msg: MidiMessage) -> Result<()> {
        if msg.is_key_down() {
            let note = Note::from_midi(msg.note);
            let mut state = self.state.lock();
            state.down_notes.insert(msg.note);
            if state.recent_notes.len() == Sequence::MAX_LEN {
                state.recent_notes.pop_front();
            }
            state.recent_notes.push_back(note);
            let down: Vec<u8> = state.down_notes.iter().copied().collect();
            let current = Chord::from_midi(&down);
            if state.recent_chords.len() == ChordProgression::MAX_LEN {
                state.recent_chords.pop_front();
            }
            state.recent_chords.push_back(current.clone());
            debug!(note = msg.note, chord = %current, "key down");
            let matched = self.evaluate(&current, &state);
            drop(state);
            for (pattern, callback) in matched {
                self.dispatch(pattern, callback);
            }
            Ok(())
        } else {
            let mut state = self.state.lock();
            if !state.down_notes.remove(&msg.note) {
                return Err(Error::NoteNotDown(msg.note));
            }
            debug!(note = msg.note, "key up");
            Ok(())
        }
    }

    /// Collects every matched handler in registration order. Handler ids
    /// are monotonic, so sorting by id restores registration order across
    /// pattern keys, not just within one.
    fn evaluate(&self, current: &Chord, state: &EngineState) -> Vec<(Pattern, Callback)> {
        let registry = self.registry.lock();
        // Exact chord hit is a plain map lookup
        let mut matched = registry.chord_callbacks(current);
        for (pattern, callbacks) in registry.iter() {
            let hit = match pattern {
                Pattern::Chord(_) => false, // covered by the lookup above
                Pattern::Sequence(seq) => seq.matches_history(&state.recent_notes),
                Pattern::Progression(prog) => prog.matches(&state.recent_chords),
            };
            if hit {
                debug!(pattern = ?pattern, "pattern matched");
                for (id, callback) in callbacks {
                    matched.push((*id, pattern.clone(), Arc::clone(callback)));
                }
            }
        }
        matched.sort_by_key(|(id, _, _)| *id);
        matched
            .into_iter()
            .map(|(_, pattern, callback)| (pattern, callback))
            .collect()
    }

    /// Fire-and-forget dispatch: one detached thread per callback, panics
    /// caught and reported on the supervisor channel.
    fn dispatch(&self, pattern: Pattern, callback: Callback) {
        let panic_tx = self.panic_tx.clone();
        std::thread::spawn(move || {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback())) {
                let message = panic_payload_message(payload);
                error!(pattern = ?pattern, "pattern handler panicked: {message}");
                let _ = panic_tx.send(HandlerPanic { pattern, message });
            }
        });
    }
}

fn panic_payload_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Stateful event loop bound to one transport.
///
/// Push-capable transports deliver straight into the engine from their
/// own callback thread and need no lifecycle calls. Poll transports are
/// drained by a background worker controlled with [`EventLoop::start`]
/// and [`EventLoop::stop`].
pub struct EventLoop {
    shared: Arc<Shared>,
    delivery: Delivery,
    // Push transports are only held to keep the connection alive
    _push_transport: Option<Box<dyn Transport>>,
    poll_transport: Option<Arc<Mutex<Box<dyn Transport>>>>,
    worker: Option<JoinHandle<()>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    panic_rx: Receiver<HandlerPanic>,
}

impl EventLoop {
    pub fn new(transport: impl Transport + 'static) -> Result<Self> {
        Self::from_boxed(Box::new(transport))
    }

    pub fn from_boxed(mut transport: Box<dyn Transport>) -> Result<Self> {
        let (panic_tx, panic_rx) = unbounded();
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState::new()),
            registry: Mutex::new(HandlerRegistry::default()),
            panic_tx,
        });
        let delivery = transport.delivery();

        let (push_transport, poll_transport) = match delivery {
            Delivery::Push => {
                let shared_cb = Arc::clone(&shared);
                transport.set_callback(Box::new(move |msg| shared_cb.handle_message(msg)))?;
                (Some(transport), None)
            }
            Delivery::Poll => (None, Some(Arc::new(Mutex::new(transport)))),
        };

        let (stop_tx, stop_rx) = bounded(1);
        debug!(?delivery, "created event loop");
        Ok(Self {
            shared,
            delivery,
            _push_transport: push_transport,
            poll_transport,
            worker: None,
            stop_tx,
            stop_rx,
            panic_rx,
        })
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Registers a callback for a pattern. Multiple handlers may share a
    /// key; all fire on match, in registration order.
    pub fn add_handler(
        &self,
        pattern: impl Into<Pattern>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> HandlerId {
        let pattern = pattern.into();
        let id = self
            .shared
            .registry
            .lock()
            .add(pattern.clone(), Arc::new(callback));
        debug!(pattern = ?pattern, "added handler");
        id
    }

    /// Registers a callback for a chord identifier such as `"C4 Major"`.
    pub fn add_handler_ident(
        &self,
        ident: &str,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<HandlerId> {
        Ok(self.add_handler(Pattern::from_ident(ident)?, callback))
    }

    /// Convenience alias for [`EventLoop::add_handler`].
    pub fn on_pattern(
        &self,
        pattern: impl Into<Pattern>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> HandlerId {
        self.add_handler(pattern, callback)
    }

    /// Removes one handler by the id returned at registration.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.shared.registry.lock().remove(id)
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        self.shared.registry.lock().clear();
        debug!("cleared all handlers");
    }

    /// Removes every handler registered under one pattern key.
    pub fn clear_handlers_for(&self, pattern: impl Into<Pattern>) -> bool {
        self.shared.registry.lock().clear_pattern(&pattern.into())
    }

    /// Removes every handler of one pattern family.
    pub fn clear_family(&self, family: PatternFamily) -> usize {
        self.shared.registry.lock().clear_family(family)
    }

    pub fn handler_count(&self) -> usize {
        self.shared.registry.lock().handler_count()
    }

    /// The currently registered pattern keys, in no particular order.
    pub fn patterns(&self) -> Vec<Pattern> {
        self.shared.registry.lock().patterns()
    }

    /// MIDI numbers of the currently held keys, ascending.
    pub fn down_notes(&self) -> Vec<u8> {
        self.shared.state.lock().down_notes.iter().copied().collect()
    }

    /// Snapshot of the recent-notes window, oldest first.
    pub fn recent_notes(&self) -> Vec<Note> {
        self.shared.state.lock().recent_notes.iter().copied().collect()
    }

    /// Snapshot of the recent-chords window, oldest first.
    pub fn recent_chords(&self) -> Vec<Chord> {
        self.shared.state.lock().recent_chords.iter().cloned().collect()
    }

    /// Receiver for handler panic reports. Clones observe the same
    /// stream.
    pub fn panic_events(&self) -> Receiver<HandlerPanic> {
        self.panic_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// A cloneable handle that stops the poll worker from any thread.
    /// This is how a pattern handler ends a blocking [`EventLoop::start`].
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Starts the drain worker for a poll transport. On a push transport
    /// this is a logged no-op. `blocking` joins the worker on the calling
    /// thread: the call returns once a [`StopHandle`] fires (typically
    /// from a pattern handler).
    pub fn start(&mut self, blocking: bool) -> Result<()> {
        let Some(transport) = self.poll_transport.as_ref() else {
            warn!("start() called on a push-mode event loop; nothing to do");
            return Ok(());
        };
        if self.worker.is_some() {
            return Err(Error::AlreadyRunning);
        }

        // Discard stop signals sent while no worker was listening
        while self.stop_rx.try_recv().is_ok() {}

        let stop_rx = self.stop_rx.clone();
        let transport = Arc::clone(transport);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::spawn(move || {
            debug!("poll worker started");
            loop {
                match stop_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        let pending = transport.lock().drain_pending();
                        for msg in pending {
                            shared.handle_message(msg);
                        }
                    }
                }
            }
            debug!("poll worker stopped");
        });

        if blocking {
            let _ = handle.join();
        } else {
            self.worker = Some(handle);
        }
        Ok(())
    }

    /// Stops the drain worker and waits for it to finish. No further
    /// messages are processed after this returns; already-dispatched
    /// handlers keep running. On a push transport this is a logged no-op.
    pub fn stop(&mut self) -> Result<()> {
        if self.poll_transport.is_none() {
            warn!("stop() called on a push-mode event loop; nothing to do");
            return Ok(());
        }
        let handle = self.worker.take().ok_or(Error::NotRunning)?;
        let _ = self.stop_tx.try_send(());
        let _ = handle.join();
        Ok(())
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn wait_until(deadline_ms: u64, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn counter_handler(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_push_mode_chord_handler_fires_once() {
        let transport = LoopbackTransport::push();
        let sender = transport.clone();
        let engine = EventLoop::new(transport).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        engine
            .add_handler_ident("C4 Major", counter_handler(&fired))
            .unwrap();

        // Any press order matches; the handler fires when the full triad
        // is down
        for note in [64, 60, 67] {
            sender.send_note_on(note, 100);
        }
        assert!(wait_until(1000, || fired.load(Ordering::SeqCst) == 1));

        for note in [64, 60, 67] {
            sender.send_note_off(note);
        }
        assert!(engine.down_notes().is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_up_for_absent_note_is_surfaced() {
        let transport = LoopbackTransport::push();
        let sender = transport.clone();
        let engine = EventLoop::new(transport).unwrap();

        // Processing continues after the error
        sender.send_note_off(60);
        sender.send_note_on(60, 100);
        assert_eq!(engine.down_notes(), vec![60]);
    }

    #[test]
    fn test_sequence_handler_requires_order() {
        let transport = LoopbackTransport::push();
        let sender = transport.clone();
        let engine = EventLoop::new(transport).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let seq = Sequence::from_ascii("C4 E4 G4").unwrap();
        engine.add_handler(seq, counter_handler(&fired));

        // Wrong order: no match
        for note in [64, 60, 67] {
            sender.send_note_on(note, 100);
            sender.send_note_off(note);
        }
        assert!(!wait_until(50, || fired.load(Ordering::SeqCst) > 0));

        // Matching order as down+up pairs
        for note in [60, 64, 67] {
            sender.send_note_on(note, 100);
            sender.send_note_off(note);
        }
        assert!(wait_until(1000, || fired.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn test_progression_handler() {
        let transport = LoopbackTransport::push();
        let sender = transport.clone();
        let engine = EventLoop::new(transport).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        // One chord snapshot per key-down while C4 major is assembled
        let prog = ChordProgression::new(vec![
            Chord::from_midi(&[60]),
            Chord::from_midi(&[60, 64]),
            Chord::from_midi(&[60, 64, 67]),
        ])
        .unwrap();
        engine.add_handler(prog, counter_handler(&fired));

        for note in [60, 64, 67] {
            sender.send_note_on(note, 100);
        }
        assert!(wait_until(1000, || fired.load(Ordering::SeqCst) == 1));

        // A further key-down unpins the progression from the history end
        sender.send_note_on(72, 100);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_panic_is_isolated_and_reported() {
        let transport = LoopbackTransport::push();
        let sender = transport.clone();
        let engine = EventLoop::new(transport).unwrap();
        let panics = engine.panic_events();

        engine
            .add_handler_ident("C4 Major", || panic!("boom"))
            .unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        engine
            .add_handler_ident("C4 Major", counter_handler(&fired))
            .unwrap();

        for note in [60, 64, 67] {
            sender.send_note_on(note, 100);
        }

        let report = panics.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(report.message, "boom");
        assert!(wait_until(1000, || fired.load(Ordering::SeqCst) == 1));

        // Loop is still alive
        for note in [60, 64, 67] {
            sender.send_note_off(note);
        }
        assert!(engine.down_notes().is_empty());
    }

    #[test]
    fn test_poll_mode_start_stop() {
        let transport = LoopbackTransport::poll();
        let sender = transport.clone();
        let mut engine = EventLoop::new(transport).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        engine
            .add_handler_ident("C4 Major", counter_handler(&fired))
            .unwrap();

        assert!(matches!(engine.stop(), Err(Error::NotRunning)));
        engine.start(false).unwrap();
        assert!(engine.is_running());
        assert!(matches!(engine.start(false), Err(Error::AlreadyRunning)));

        for note in [60, 64, 67] {
            sender.send_note_on(note, 100);
        }
        assert!(wait_until(1000, || fired.load(Ordering::SeqCst) == 1));

        engine.stop().unwrap();
        assert!(!engine.is_running());

        // Messages after stop() are not processed
        sender.send_note_on(72, 100);
        std::thread::sleep(Duration::from_millis(20));
        assert!(!engine.down_notes().contains(&72));
        assert_eq!(sender.pending_len(), 1);
    }

    #[test]
    fn test_blocking_start_stopped_from_handler() {
        let transport = LoopbackTransport::poll();
        let sender = transport.clone();
        let mut engine = EventLoop::new(transport).unwrap();

        let stop = engine.stop_handle();
        engine
            .add_handler_ident("C4 Major", move || stop.stop())
            .unwrap();

        // Queued before start; the worker drains them once running
        for note in [60, 64, 67] {
            sender.send_note_on(note, 100);
        }
        // Returns once the handler fires the stop handle
        engine.start(true).unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.down_notes(), vec![60, 64, 67]);
    }

    #[test]
    fn test_stale_stop_signal_does_not_kill_next_start() {
        let transport = LoopbackTransport::poll();
        let sender = transport.clone();
        let mut engine = EventLoop::new(transport).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        engine
            .add_handler_ident("C4 Major", counter_handler(&fired))
            .unwrap();

        // Fired while nothing is running
        engine.stop_handle().stop();

        engine.start(false).unwrap();
        for note in [60, 64, 67] {
            sender.send_note_on(note, 100);
        }
        assert!(wait_until(1000, || fired.load(Ordering::SeqCst) == 1));
        engine.stop().unwrap();
    }

    #[test]
    fn test_matched_handlers_follow_registration_order() {
        let (panic_tx, _panic_rx) = unbounded();
        let shared = Shared {
            state: Mutex::new(EngineState::new()),
            registry: Mutex::new(HandlerRegistry::default()),
            panic_tx,
        };

        // Two sequence keys share a tail, so one key-down matches both
        let long = Pattern::Sequence(Sequence::from_ascii("C4 E4 G4").unwrap());
        let short = Pattern::Sequence(Sequence::from_ascii("E4 G4").unwrap());

        let mut state = EngineState::new();
        for m in [60u8, 64, 67] {
            state.recent_notes.push_back(Note::from_midi(m));
        }
        let current = Chord::from_midi(&[67]);

        shared.registry.lock().add(long.clone(), Arc::new(|| {}));
        shared.registry.lock().add(short.clone(), Arc::new(|| {}));
        let matched: Vec<Pattern> = shared
            .evaluate(&current, &state)
            .into_iter()
            .map(|(pattern, _)| pattern)
            .collect();
        assert_eq!(matched, vec![long.clone(), short.clone()]);

        // Swapping registration order swaps dispatch order
        shared.registry.lock().clear();
        shared.registry.lock().add(short.clone(), Arc::new(|| {}));
        shared.registry.lock().add(long.clone(), Arc::new(|| {}));
        let matched: Vec<Pattern> = shared
            .evaluate(&current, &state)
            .into_iter()
            .map(|(pattern, _)| pattern)
            .collect();
        assert_eq!(matched, vec![short, long]);
    }

    #[test]
    fn test_recent_notes_window_evicts_oldest() {
        let transport = LoopbackTransport::push();
        let sender = transport.clone();
        let engine = EventLoop::new(transport).unwrap();

        for note in 0..(Sequence::MAX_LEN as u8 + 4) {
            sender.send_note_on(note, 100);
            sender.send_note_off(note);
        }
        let recent = engine.recent_notes();
        assert_eq!(recent.len(), Sequence::MAX_LEN);
        assert_eq!(recent[0].midi(), 4); // first four evicted
    }

    #[test]
    fn test_clear_handlers() {
        let transport = LoopbackTransport::push();
        let engine = EventLoop::new(transport).unwrap();

        engine.add_handler_ident("C4 Major", || {}).unwrap();
        let seq_id = engine.add_handler(Sequence::from_ascii("C4 E4").unwrap(), || {});
        assert_eq!(engine.handler_count(), 2);

        assert!(engine.remove_handler(seq_id));
        assert_eq!(engine.handler_count(), 1);

        engine.clear_handlers();
        assert_eq!(engine.handler_count(), 0);
    }

    #[test]
    fn test_clear_family_leaves_other_families() {
        let transport = LoopbackTransport::push();
        let engine = EventLoop::new(transport).unwrap();

        engine.add_handler_ident("C4 Major", || {}).unwrap();
        engine.add_handler(Sequence::from_ascii("C4 E4").unwrap(), || {});
        assert_eq!(engine.clear_family(PatternFamily::Sequence), 1);
        assert_eq!(engine.handler_count(), 1);
    }

    #[test]
    fn test_lifecycle_noops_in_push_mode() {
        let transport = LoopbackTransport::push();
        let mut engine = EventLoop::new(transport).unwrap();
        engine.start(false).unwrap();
        assert!(!engine.is_running());
        engine.stop().unwrap();
    }
}
