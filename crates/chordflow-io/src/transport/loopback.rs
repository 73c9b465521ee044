//! In-memory loopback transport for tests and examples.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Delivery, MessageCallback, MidiMessage, Transport};
use crate::error::{Error, Result};

struct Inner {
    callback: Option<MessageCallback>,
    pending: VecDeque<MidiMessage>,
}

/// Test transport with programmatic message injection and no physical
/// device.
///
/// Constructible in either delivery mode. Clones share the same queue and
/// callback, so a test can keep a sending handle after moving the
/// transport into an event loop. In push mode, messages sent before the
/// callback is installed are flushed to it on installation.
#[derive(Clone)]
pub struct LoopbackTransport {
    delivery: Delivery,
    inner: Arc<Mutex<Inner>>,
}

impl LoopbackTransport {
    pub fn push() -> Self {
        Self::with_delivery(Delivery::Push)
    }

    pub fn poll() -> Self {
        Self::with_delivery(Delivery::Poll)
    }

    pub fn with_delivery(delivery: Delivery) -> Self {
        Self {
            delivery,
            inner: Arc::new(Mutex::new(Inner {
                callback: None,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Injects a message as if it arrived from a device.
    pub fn send(&self, msg: MidiMessage) {
        let mut inner = self.inner.lock();
        if self.delivery == Delivery::Push {
            if let Some(callback) = inner.callback.as_mut() {
                callback(msg);
                return;
            }
        }
        inner.pending.push_back(msg);
    }

    pub fn send_note_on(&self, note: u8, velocity: u8) {
        self.send(MidiMessage::note_on(note, velocity));
    }

    pub fn send_note_off(&self, note: u8) {
        self.send(MidiMessage::note_off(note));
    }

    /// Number of messages waiting to be drained or flushed.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

impl Transport for LoopbackTransport {
    fn delivery(&self) -> Delivery {
        self.delivery
    }

    fn set_callback(&mut self, mut callback: MessageCallback) -> Result<()> {
        if self.delivery != Delivery::Push {
            return Err(Error::WrongDelivery("set_callback", self.delivery));
        }
        let mut inner = self.inner.lock();
        // Deliver anything queued before the engine attached
        for msg in inner.pending.drain(..) {
            callback(msg);
        }
        inner.callback = Some(callback);
        Ok(())
    }

    fn drain_pending(&mut self) -> Vec<MidiMessage> {
        self.inner.lock().pending.drain(..).collect()
    }
}
