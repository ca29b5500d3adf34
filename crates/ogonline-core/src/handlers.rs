//! Handlers executed when a message arrives.
//!
//! One unit struct per message type. Role checks live in the handler: a
//! message the local side should never receive is logged and ignored.

mod attach_to;
mod handshake;
mod movement;
mod objects;
mod players;
mod script_params;

use ogonline_proto::messages::*;

use crate::register_handlers;
use crate::registry::HandlerRegistry;

pub use attach_to::AttachToHandler;
pub use handshake::{
    AssignPlayerIdHandler, BuildVersionHandler, BuildVersionRequestHandler, ClientParametersHandler,
    FileTransferMetadataHandler, LoadingCompletedHandler, SessionParametersHandler,
};
pub use movement::{
    CameraTransformHandler, CutLineHandler, LevelMessageHandler, MorphTargetUpdateHandler,
    MovementObjectUpdateHandler, PlayerInputHandler,
};
pub use objects::{CreateEntityHandler, RemoveObjectHandler, SetObjectEnabledHandler};
pub use players::{
    ChatEntryHandler, HostSessionFlagHandler, PingHandler, PongHandler, RemovePlayerStateHandler,
    SetPlayerStateHandler,
};
pub use script_params::{
    ScriptParamRemoveHandler, ScriptParamRenameHandler, ScriptParamStringHandler, ScriptParamUnionHandler,
};

/// Registry with a handler for every message type.
pub fn default_registry() -> HandlerRegistry {
    register_handlers! {
        BuildVersionRequest => BuildVersionRequestHandler,
        BuildVersion => BuildVersionHandler,
        SessionParameters => SessionParametersHandler,
        ClientParameters => ClientParametersHandler,
        FileTransferMetadata => FileTransferMetadataHandler,
        LoadingCompleted => LoadingCompletedHandler,
        AssignPlayerId => AssignPlayerIdHandler,
        SetPlayerState => SetPlayerStateHandler,
        RemovePlayerState => RemovePlayerStateHandler,
        ChatEntry => ChatEntryHandler,
        HostSessionFlag => HostSessionFlagHandler,
        Ping => PingHandler,
        Pong => PongHandler,
        AttachTo => AttachToHandler,
        ScriptParamString => ScriptParamStringHandler,
        ScriptParamUnion => ScriptParamUnionHandler,
        ScriptParamRemove => ScriptParamRemoveHandler,
        ScriptParamRename => ScriptParamRenameHandler,
        SetObjectEnabled => SetObjectEnabledHandler,
        RemoveObject => RemoveObjectHandler,
        CreateEntity => CreateEntityHandler,
        CameraTransform => CameraTransformHandler,
        MovementObjectUpdate => MovementObjectUpdateHandler,
        MorphTargetUpdate => MorphTargetUpdateHandler,
        PlayerInput => PlayerInputHandler,
        LevelMessage => LevelMessageHandler,
        CutLine => CutLineHandler,
    }
}
