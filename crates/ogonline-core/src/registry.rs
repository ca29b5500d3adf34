//! Handler registry for message execution.
//!
//! Each message type that does something on arrival has one handler. The
//! registry routes a received [`OnlineMessageRef`] to it by message type.

use std::collections::HashMap;
use std::marker::PhantomData;

use ogonline_proto::{MessageKind, MessageType, PeerId};
use tracing::error;

use crate::message_ref::OnlineMessageRef;
use crate::online::Online;
use crate::scene::SceneGraph;

/// What a handler may touch while executing.
pub struct ExecuteContext<'a> {
    pub online: &'a mut Online,
    pub scene: &'a mut dyn SceneGraph,
}

/// Executes one message type on the main thread.
///
/// `message_ref` is the shared envelope; handlers that keep the message
/// around (e.g. buffered movement frames) clone it instead of copying `message`.
pub trait Handler<M: MessageKind>: Send + Sync {
    fn execute(
        &self,
        ctx: &mut ExecuteContext<'_>,
        message: &M,
        message_ref: &OnlineMessageRef,
        from: PeerId,
    );
}

/// Type-erased handler stored in the registry.
pub(crate) trait ErasedHandler: Send + Sync {
    fn execute_erased(&self, ctx: &mut ExecuteContext<'_>, message_ref: &OnlineMessageRef, from: PeerId);
}

pub(crate) struct TypedHandler<M, H> {
    handler: H,
    _marker: PhantomData<fn() -> M>,
}

impl<M, H> TypedHandler<M, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<M, H> ErasedHandler for TypedHandler<M, H>
where
    M: MessageKind,
    H: Handler<M>,
{
    fn execute_erased(&self, ctx: &mut ExecuteContext<'_>, message_ref: &OnlineMessageRef, from: PeerId) {
        match message_ref.get::<M>() {
            Some(message) => self.handler.execute(ctx, message, message_ref, from),
            None => error!(
                expected = ?M::TYPE,
                actual = ?message_ref.message_type(),
                "handler registered under the wrong message type"
            ),
        }
    }
}

/// Registry mapping MessageType to type-erased handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<MessageType, Box<dyn ErasedHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M, H>(&mut self, handler: H)
    where
        M: MessageKind,
        H: Handler<M> + 'static,
    {
        self.handlers
            .insert(M::TYPE, Box::new(TypedHandler::<M, H>::new(handler)));
    }

    /// Runs the handler for the message. Returns false if none is registered.
    pub fn execute(&self, ctx: &mut ExecuteContext<'_>, message_ref: &OnlineMessageRef, from: PeerId) -> bool {
        match self.handlers.get(&message_ref.message_type()) {
            Some(handler) => {
                handler.execute_erased(ctx, message_ref, from);
                true
            }
            None => false,
        }
    }

    pub fn has_handler(&self, message_type: MessageType) -> bool {
        self.handlers.contains_key(&message_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builds a [`HandlerRegistry`] from `Message => Handler` pairs.
///
/// # Example
/// ```ignore
/// let registry = register_handlers! {
///     AttachTo => AttachToHandler,
///     ChatEntry => ChatEntryHandler,
/// };
/// ```
#[macro_export]
macro_rules! register_handlers {
    ($($msg_type:ty => $handler:expr),* $(,)?) => {{
        let mut registry = $crate::registry::HandlerRegistry::new();
        $(
            registry.register::<$msg_type, _>($handler);
        )*
        registry
    }};
}
