use std::fmt::Debug;

use crate::category::{Delivery, MessageCategory};
use crate::msg_type::MessageType;
use crate::value::{FieldReader, Object};

pub mod gameplay;
pub mod handshake;
pub mod script_params;
pub mod session;

pub use gameplay::*;
pub use handshake::*;
pub use script_params::*;
pub use session::*;

/// A session message: how it is classified and how it is written to and read
/// from an [`Object`].
///
/// `deserialize` starts from `Default::default()`; fields it cannot find keep
/// their defaults.
pub trait Message: Default + Clone + Debug + PartialEq + Send + Sync + 'static {
    const CATEGORY: MessageCategory;
    const DELIVERY: Delivery = Delivery::Reliable;

    fn serialize(&self) -> Object;
    fn deserialize(&mut self, reader: &mut FieldReader<'_>);
}

/// Links a message struct to its [`OnlineMessage`] variant.
///
/// Note: implemented by `define_messages!`. Do not implement this trait manually.
pub trait MessageKind: Message {
    const TYPE: MessageType;

    fn from_online(message: &OnlineMessage) -> Option<&Self>;
}

macro_rules! define_messages {
    ($($name:ident),* $(,)?) => {
        /// Every message the session can carry, tagged by [`MessageType`].
        #[derive(Debug, Clone, PartialEq)]
        pub enum OnlineMessage {
            $($name($name),)*
        }

        impl OnlineMessage {
            /// Default-initialized message for a tag. Every [`MessageType`] has a variant.
            pub fn construct(message_type: MessageType) -> Self {
                match message_type {
                    $(MessageType::$name => OnlineMessage::$name($name::default()),)*
                }
            }

            pub fn message_type(&self) -> MessageType {
                match self {
                    $(OnlineMessage::$name(_) => MessageType::$name,)*
                }
            }

            pub fn category(&self) -> MessageCategory {
                match self {
                    $(OnlineMessage::$name(_) => <$name as Message>::CATEGORY,)*
                }
            }

            pub fn delivery(&self) -> Delivery {
                match self {
                    $(OnlineMessage::$name(_) => <$name as Message>::DELIVERY,)*
                }
            }

            pub fn serialize(&self) -> Object {
                match self {
                    $(OnlineMessage::$name(m) => m.serialize(),)*
                }
            }

            pub fn deserialize_into(&mut self, reader: &mut FieldReader<'_>) {
                match self {
                    $(OnlineMessage::$name(m) => m.deserialize(reader),)*
                }
            }
        }

        $(
            impl MessageKind for $name {
                const TYPE: MessageType = MessageType::$name;

                fn from_online(message: &OnlineMessage) -> Option<&Self> {
                    match message {
                        OnlineMessage::$name(m) => Some(m),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl From<$name> for OnlineMessage {
                fn from(m: $name) -> Self {
                    OnlineMessage::$name(m)
                }
            }
        )*
    };
}

define_messages! {
    BuildVersionRequest,
    BuildVersion,
    SessionParameters,
    ClientParameters,
    FileTransferMetadata,
    LoadingCompleted,
    AssignPlayerId,
    SetPlayerState,
    RemovePlayerState,
    ChatEntry,
    HostSessionFlag,
    Ping,
    Pong,

    AttachTo,
    ScriptParamString,
    ScriptParamUnion,
    ScriptParamRemove,
    ScriptParamRename,
    SetObjectEnabled,
    RemoveObject,
    CreateEntity,

    CameraTransform,
    MovementObjectUpdate,
    MorphTargetUpdate,
    PlayerInput,
    LevelMessage,
    CutLine,
}
