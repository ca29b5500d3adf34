//! Shared, reference-counted message envelope.
//!
//! A message is built once and then handed out to every queue, log entry and
//! scene object that needs it. The payload is dropped exactly when the last
//! holder lets go.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ogonline_proto::{MessageCategory, MessageKind, MessageType, OnlineMessage};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Envelope {
    id: u64,
    message: OnlineMessage,
}

/// Cloneable handle to a message. Cloning bumps the count, dropping releases it.
#[derive(Debug, Clone)]
pub struct OnlineMessageRef {
    inner: Arc<Envelope>,
}

impl OnlineMessageRef {
    pub fn new(message: impl Into<OnlineMessage>) -> Self {
        Self {
            inner: Arc::new(Envelope {
                id: NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed),
                message: message.into(),
            }),
        }
    }

    /// Process-unique id, mostly useful in logs.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn data(&self) -> &OnlineMessage {
        &self.inner.message
    }

    pub fn message_type(&self) -> MessageType {
        self.inner.message.message_type()
    }

    pub fn category(&self) -> MessageCategory {
        self.inner.message.category()
    }

    /// Typed view of the payload, `None` if it is another message.
    pub fn get<M: MessageKind>(&self) -> Option<&M> {
        M::from_online(&self.inner.message)
    }

    /// Number of live handles to this message.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn downgrade(&self) -> WeakMessageRef {
        WeakMessageRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

/// Observes a message without keeping it alive.
#[derive(Debug, Clone)]
pub struct WeakMessageRef {
    inner: Weak<Envelope>,
}

impl WeakMessageRef {
    pub fn upgrade(&self) -> Option<OnlineMessageRef> {
        self.inner.upgrade().map(|inner| OnlineMessageRef { inner })
    }

    pub fn is_released(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogonline_proto::messages::{ChatEntry, Ping};

    #[test]
    fn typed_access() {
        let r = OnlineMessageRef::new(Ping { id: 9 });
        assert_eq!(r.message_type(), MessageType::Ping);
        assert_eq!(r.get::<Ping>().map(|p| p.id), Some(9));
        assert!(r.get::<ChatEntry>().is_none());
    }

    #[test]
    fn ids_are_unique() {
        let a = OnlineMessageRef::new(Ping { id: 1 });
        let b = OnlineMessageRef::new(Ping { id: 1 });
        assert_ne!(a.id(), b.id());
        assert!(OnlineMessageRef::ptr_eq(&a, &a.clone()));
        assert!(!OnlineMessageRef::ptr_eq(&a, &b));
    }

    #[test]
    fn released_with_last_handle() {
        let r = OnlineMessageRef::new(Ping { id: 1 });
        let weak = r.downgrade();
        let copy = r.clone();
        assert_eq!(r.ref_count(), 2);
        drop(r);
        assert!(!weak.is_released());
        drop(copy);
        assert!(weak.is_released());
        assert!(weak.upgrade().is_none());
    }
}
