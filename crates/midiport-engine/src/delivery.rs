//! Inbound message pipeline shared by every input backend.
//!
//! - Backend thread: `DeliveryState::receive` (filter -> stamp -> callback or queue)
//! - Application thread: `InputShared::pop_into` (non-blocking queue read)

use arc_swap::ArcSwapOption;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::error::{Error, Result};

/// Largest inbound message the engine will buffer or deliver.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default inbound queue capacity, in messages.
pub const DEFAULT_QUEUE_SIZE_LIMIT: usize = 100;

/// Called on the backend's delivery thread with `(delta_seconds, bytes, token)`.
pub type DeliverFn = fn(f64, &[u8], u64);

/// Message classes filtered before they reach either delivery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IgnoreTypes {
    /// System exclusive (`0xF0 .. 0xF7`).
    pub sysex: bool,
    /// MIDI time code (`0xF1`) and timing clock (`0xF8`).
    pub time: bool,
    /// Active sensing (`0xFE`).
    pub active_sense: bool,
}

impl IgnoreTypes {
    pub const ALL: IgnoreTypes = IgnoreTypes {
        sysex: true,
        time: true,
        active_sense: true,
    };

    pub const NONE: IgnoreTypes = IgnoreTypes {
        sysex: false,
        time: false,
        active_sense: false,
    };

    pub const fn new(sysex: bool, time: bool, active_sense: bool) -> Self {
        Self {
            sysex,
            time,
            active_sense,
        }
    }

    pub const fn bits(self) -> u8 {
        (self.sysex as u8) | ((self.time as u8) << 1) | ((self.active_sense as u8) << 2)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            sysex: bits & 0x01 != 0,
            time: bits & 0x02 != 0,
            active_sense: bits & 0x04 != 0,
        }
    }

    /// Whether a message starting with these bytes is filtered out.
    pub fn filters(self, bytes: &[u8]) -> bool {
        match bytes.first() {
            Some(0xF0) | Some(0xF7) => self.sysex,
            Some(0xF1) | Some(0xF8) => self.time,
            Some(0xFE) => self.active_sense,
            _ => false,
        }
    }
}

impl Default for IgnoreTypes {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug)]
struct QueuedMessage {
    bytes: Vec<u8>,
    delta: f64,
    connection: u64,
}

#[derive(Debug, Clone, Copy)]
struct CallbackTarget {
    deliver: DeliverFn,
    token: u64,
}

/// State shared between an input handle and whatever thread feeds it.
///
/// Every open and close starts a new connection epoch. Delivery states and
/// queued messages remember the epoch they belong to, and anything from an
/// earlier epoch is dropped.
pub(crate) struct InputShared {
    ignore: AtomicU8,
    connection: AtomicU64,
    callback: ArcSwapOption<CallbackTarget>,
    queue_tx: Sender<QueuedMessage>,
    queue_rx: Receiver<QueuedMessage>,
}

impl InputShared {
    pub(crate) fn new(queue_size_limit: usize) -> Arc<Self> {
        let (queue_tx, queue_rx) = bounded(queue_size_limit.max(1));
        Arc::new(Self {
            ignore: AtomicU8::new(IgnoreTypes::default().bits()),
            connection: AtomicU64::new(0),
            callback: ArcSwapOption::empty(),
            queue_tx,
            queue_rx,
        })
    }

    pub(crate) fn set_ignore_types(&self, ignore: IgnoreTypes) {
        self.ignore.store(ignore.bits(), Ordering::Release);
    }

    pub(crate) fn ignore_types(&self) -> IgnoreTypes {
        IgnoreTypes::from_bits(self.ignore.load(Ordering::Acquire))
    }

    pub(crate) fn set_callback(&self, deliver: DeliverFn, token: u64) -> Result<()> {
        if self.callback.load().is_some() {
            return Err(Error::CallbackAlreadySet);
        }
        self.callback
            .store(Some(Arc::new(CallbackTarget { deliver, token })));
        Ok(())
    }

    /// Installs the target whether or not one is already set. There is no
    /// window in which messages fall through to the queue.
    pub(crate) fn replace_callback(&self, deliver: DeliverFn, token: u64) {
        self.callback
            .store(Some(Arc::new(CallbackTarget { deliver, token })));
    }

    pub(crate) fn cancel_callback(&self) -> Result<()> {
        match self.callback.swap(None) {
            Some(_) => Ok(()),
            None => Err(Error::NoCallback),
        }
    }

    pub(crate) fn has_callback(&self) -> bool {
        self.callback.load().is_some()
    }

    /// Starts a new epoch for a connection being opened.
    pub(crate) fn begin_connection(&self) -> u64 {
        self.advance_connection()
    }

    /// Retires the current connection: its delivery states go stale and
    /// whatever it left in the queue is discarded.
    pub(crate) fn end_connection(&self) {
        self.advance_connection();
    }

    fn advance_connection(&self) -> u64 {
        let epoch = self.connection.fetch_add(1, Ordering::AcqRel) + 1;
        while self.queue_rx.try_recv().is_ok() {}
        epoch
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.connection.load(Ordering::Acquire) == epoch
    }

    /// Non-blocking. Returns `(0, 0.0)` when the queue is empty.
    pub(crate) fn pop_into(&self, buf: &mut [u8]) -> Result<(usize, f64)> {
        if self.has_callback() {
            return Err(Error::CallbackActive);
        }
        loop {
            match self.queue_rx.try_recv() {
                // Pushed by a delivery that raced a close.
                Ok(message) if !self.is_current(message.connection) => continue,
                Ok(message) => {
                    let size = message.bytes.len();
                    if size > buf.len() {
                        return Err(Error::MessageTooLarge {
                            size,
                            capacity: buf.len(),
                        });
                    }
                    buf[..size].copy_from_slice(&message.bytes);
                    return Ok((size, message.delta));
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok((0, 0.0)),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue_rx.len()
    }
}

/// Per-connection receive state, owned by the delivery thread.
pub(crate) struct DeliveryState {
    shared: Arc<InputShared>,
    connection: u64,
    last_stamp: Option<f64>,
}

impl DeliveryState {
    /// Begins a new connection epoch on `shared`.
    pub(crate) fn new(shared: Arc<InputShared>) -> Self {
        let connection = shared.begin_connection();
        Self {
            shared,
            connection,
            last_stamp: None,
        }
    }

    /// False once the connection this state was created for has closed.
    pub(crate) fn is_current(&self) -> bool {
        self.shared.is_current(self.connection)
    }

    /// `stamp` is in seconds on any clock that is monotonic for this connection.
    pub(crate) fn receive(&mut self, stamp: f64, bytes: &[u8]) {
        if !self.is_current() {
            return;
        }
        if bytes.is_empty() || self.shared.ignore_types().filters(bytes) {
            return;
        }
        if bytes.len() > MAX_MESSAGE_SIZE {
            warn!(
                "Dropping {} byte MIDI message (limit {})",
                bytes.len(),
                MAX_MESSAGE_SIZE
            );
            return;
        }

        let delta = match self.last_stamp {
            Some(last) => (stamp - last).max(0.0),
            None => 0.0,
        };
        self.last_stamp = Some(stamp);

        let callback = self.shared.callback.load();
        if let Some(target) = callback.as_ref() {
            (target.deliver)(delta, bytes, target.token);
            return;
        }

        let message = QueuedMessage {
            bytes: bytes.to_vec(),
            delta,
            connection: self.connection,
        };
        if let Err(TrySendError::Full(_)) = self.shared.queue_tx.try_send(message) {
            warn!("MIDI input queue limit reached, dropping message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    static CALLED: AtomicUsize = AtomicUsize::new(0);
    static REPLACED: AtomicUsize = AtomicUsize::new(0);

    fn count_replaced(_delta: f64, _bytes: &[u8], _token: u64) {
        REPLACED.fetch_add(1, Ordering::SeqCst);
    }

    fn count_delivery(_delta: f64, _bytes: &[u8], token: u64) {
        assert_eq!(token, 7);
        CALLED.fetch_add(1, Ordering::SeqCst);
    }

    fn pop(shared: &InputShared) -> (Vec<u8>, f64) {
        let mut buf = [0u8; 16];
        let (size, delta) = shared.pop_into(&mut buf).unwrap();
        (buf[..size].to_vec(), delta)
    }

    #[test]
    fn test_ignore_bits_roundtrip_matches_flags() {
        assert_eq!(IgnoreTypes::ALL.bits(), 0x07);
        assert_eq!(IgnoreTypes::NONE.bits(), 0x00);
        assert_eq!(IgnoreTypes::new(false, true, false).bits(), 0x02);
        assert_eq!(IgnoreTypes::from_bits(0x05), IgnoreTypes::new(true, false, true));
    }

    #[test]
    fn test_filter_classes() {
        let all = IgnoreTypes::ALL;
        assert!(all.filters(&[0xF0, 0x7E, 0xF7]));
        assert!(all.filters(&[0xF7]));
        assert!(all.filters(&[0xF1, 0x20]));
        assert!(all.filters(&[0xF8]));
        assert!(all.filters(&[0xFE]));
        assert!(!all.filters(&[0x90, 60, 100]));
        assert!(!all.filters(&[0xFA]));

        let none = IgnoreTypes::NONE;
        assert!(!none.filters(&[0xF0, 0xF7]));
        assert!(!none.filters(&[0xF8]));
        assert!(!none.filters(&[0xFE]));
    }

    #[test]
    fn test_first_delta_is_zero_then_relative() {
        let shared = InputShared::new(8);
        let mut state = DeliveryState::new(shared.clone());

        state.receive(10.0, &[0x90, 60, 100]);
        state.receive(10.25, &[0x80, 60, 0]);

        let (bytes, delta) = pop(&shared);
        assert_eq!(bytes, vec![0x90, 60, 100]);
        assert_eq!(delta, 0.0);

        let (bytes, delta) = pop(&shared);
        assert_eq!(bytes, vec![0x80, 60, 0]);
        assert!((delta - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_filtered_messages_do_not_advance_stamp() {
        let shared = InputShared::new(8);
        let mut state = DeliveryState::new(shared.clone());

        state.receive(1.0, &[0x90, 60, 100]);
        state.receive(2.0, &[0xFE]);
        state.receive(3.0, &[0x80, 60, 0]);

        pop(&shared);
        let (_, delta) = pop(&shared);
        assert!((delta - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_queue_reads_zero() {
        let shared = InputShared::new(4);
        assert_eq!(pop(&shared), (Vec::new(), 0.0));
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let shared = InputShared::new(2);
        let mut state = DeliveryState::new(shared.clone());
        for note in 0..4u8 {
            state.receive(note as f64, &[0x90, note, 100]);
        }
        assert_eq!(shared.queued(), 2);
        assert_eq!(pop(&shared).0, vec![0x90, 0, 100]);
        assert_eq!(pop(&shared).0, vec![0x90, 1, 100]);
        assert_eq!(pop(&shared).0, Vec::<u8>::new());
    }

    #[test]
    fn test_callback_bypasses_queue() {
        let shared = InputShared::new(4);
        let mut state = DeliveryState::new(shared.clone());
        shared.set_callback(count_delivery, 7).unwrap();

        let before = CALLED.load(Ordering::SeqCst);
        state.receive(0.0, &[0xB0, 7, 127]);
        assert_eq!(CALLED.load(Ordering::SeqCst), before + 1);
        assert_eq!(shared.queued(), 0);

        let mut buf = [0u8; 4];
        assert!(matches!(
            shared.pop_into(&mut buf),
            Err(Error::CallbackActive)
        ));
    }

    #[test]
    fn test_callback_set_twice_and_cancel_without_callback() {
        let shared = InputShared::new(4);
        assert!(matches!(shared.cancel_callback(), Err(Error::NoCallback)));
        shared.set_callback(count_delivery, 7).unwrap();
        assert!(matches!(
            shared.set_callback(count_delivery, 7),
            Err(Error::CallbackAlreadySet)
        ));
        shared.cancel_callback().unwrap();
        assert!(!shared.has_callback());
    }

    #[test]
    fn test_message_larger_than_buffer() {
        let shared = InputShared::new(4);
        let mut state = DeliveryState::new(shared.clone());
        state.receive(0.0, &[0x90, 60, 100]);

        let mut buf = [0u8; 2];
        assert!(matches!(
            shared.pop_into(&mut buf),
            Err(Error::MessageTooLarge {
                size: 3,
                capacity: 2
            })
        ));
    }

    #[test]
    fn test_replace_callback_keeps_queue_empty() {
        let shared = InputShared::new(4);
        let mut state = DeliveryState::new(shared.clone());
        shared.replace_callback(count_replaced, 1);
        shared.replace_callback(count_replaced, 2);
        assert!(shared.has_callback());

        let before = REPLACED.load(Ordering::SeqCst);
        for note in 0..8u8 {
            state.receive(note as f64, &[0x90, note, 1]);
            shared.replace_callback(count_replaced, note as u64 + 3);
        }
        assert_eq!(REPLACED.load(Ordering::SeqCst), before + 8);
        assert_eq!(shared.queued(), 0);
    }

    #[test]
    fn test_closed_connection_drops_deliveries() {
        let shared = InputShared::new(8);
        let mut state = DeliveryState::new(shared.clone());
        state.receive(0.0, &[0x90, 60, 100]);
        assert_eq!(shared.queued(), 1);

        shared.end_connection();
        assert!(!state.is_current());
        assert_eq!(shared.queued(), 0);
        state.receive(1.0, &[0x80, 60, 0]);
        assert_eq!(pop(&shared), (Vec::new(), 0.0));

        let mut reopened = DeliveryState::new(shared.clone());
        assert!(!state.is_current());
        reopened.receive(2.0, &[0x90, 61, 100]);
        assert_eq!(pop(&shared), (vec![0x90, 61, 100], 0.0));
    }

    #[test]
    fn test_queued_message_from_previous_connection_is_skipped() {
        let shared = InputShared::new(8);
        let mut old = DeliveryState::new(shared.clone());
        old.receive(0.0, &[0x90, 1, 1]);
        // A push that landed after the epoch moved on but before the queue was cleared.
        shared.connection.fetch_add(1, Ordering::AcqRel);
        assert_eq!(shared.queued(), 1);
        assert_eq!(pop(&shared), (Vec::new(), 0.0));
    }

    #[test]
    fn test_oversize_message_is_dropped() {
        let shared = InputShared::new(4);
        let mut state = DeliveryState::new(shared.clone());
        let mut oversize = vec![0u8; MAX_MESSAGE_SIZE + 1];
        oversize[0] = 0x90;
        state.receive(0.0, &oversize);
        assert_eq!(shared.queued(), 0);

        let mut largest = vec![0u8; MAX_MESSAGE_SIZE];
        largest[0] = 0x90;
        state.receive(1.0, &largest);
        assert_eq!(shared.queued(), 1);

        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        let (size, delta) = shared.pop_into(&mut buf).unwrap();
        assert_eq!(size, MAX_MESSAGE_SIZE);
        assert_eq!(delta, 0.0);
        assert_eq!(buf, largest);
    }
}
