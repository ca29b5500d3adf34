//! FIFO queues between the main thread and the network worker, plus the
//! persistent message log.

use crossbeam_channel::{Receiver, Sender, unbounded};
use ogonline_proto::{ConnId, MessageCategory, PeerId};
use parking_lot::Mutex;

use crate::message_ref::OnlineMessageRef;

/// Unbounded multi-producer FIFO.
pub struct MessageQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, item: T) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(item);
    }

    pub fn pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Items queued at the time of the call, in order.
    pub fn drain(&self) -> Vec<T> {
        let n = self.rx.len();
        self.rx.try_iter().take(n).collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where an outgoing message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Broadcast,
    Connection(ConnId),
}

/// Work item for the network worker.
#[derive(Debug, Clone)]
pub enum Outgoing {
    Message {
        target: Target,
        message: OnlineMessageRef,
    },
    /// Send the whole persistent log to one connection, then mark it as
    /// having received it. Queued right after the level metadata so the
    /// client sees the level before its mutations.
    ReplayPersistentLog { conn_id: ConnId },
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub from: PeerId,
    pub message: OnlineMessageRef,
}

/// Ordered log of level-persistent messages for late joiners.
#[derive(Debug, Default)]
pub struct PersistentLog {
    entries: Mutex<Vec<OnlineMessageRef>>,
}

impl PersistentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: OnlineMessageRef) {
        debug_assert_eq!(message.category(), MessageCategory::LevelPersistent);
        self.entries.lock().push(message);
    }

    /// Copy of the log in append order.
    pub fn snapshot(&self) -> Vec<OnlineMessageRef> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Releases every entry. Called when the level changes.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
