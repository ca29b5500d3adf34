use strum::FromRepr;

/// Wire tag of every message the session understands.
///
/// Tags are stable across builds; new messages take new numbers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr)]
pub enum MessageType {
    BuildVersionRequest = 1,
    BuildVersion = 2,
    SessionParameters = 3,
    ClientParameters = 4,
    FileTransferMetadata = 5,
    LoadingCompleted = 6,
    AssignPlayerId = 7,
    SetPlayerState = 8,
    RemovePlayerState = 9,
    ChatEntry = 10,
    HostSessionFlag = 11,
    Ping = 12,
    Pong = 13,

    AttachTo = 20,
    ScriptParamString = 21,
    ScriptParamUnion = 22,
    ScriptParamRemove = 23,
    ScriptParamRename = 24,
    SetObjectEnabled = 25,
    RemoveObject = 26,
    CreateEntity = 27,

    CameraTransform = 30,
    MovementObjectUpdate = 31,
    MorphTargetUpdate = 32,
    PlayerInput = 33,
    LevelMessage = 34,
    CutLine = 35,
}

impl MessageType {
    /// Session plumbing, handled regardless of the sender's handshake state.
    pub const fn is_control(self) -> bool {
        (self as u8) < 20
    }

    /// What a joining client sends while the host is still admitting it.
    /// Anything else from a client that is not yet active is ignored.
    pub const fn is_handshake_reply(self) -> bool {
        matches!(
            self,
            MessageType::BuildVersion | MessageType::ClientParameters | MessageType::LoadingCompleted
        )
    }

    /// Messages only the host may originate. A client sending one of these is
    /// treated as a bad request.
    pub const fn is_host_only(self) -> bool {
        matches!(
            self,
            MessageType::BuildVersionRequest
                | MessageType::SessionParameters
                | MessageType::FileTransferMetadata
                | MessageType::AssignPlayerId
                | MessageType::SetPlayerState
                | MessageType::RemovePlayerState
                | MessageType::HostSessionFlag
                | MessageType::CreateEntity
                | MessageType::RemoveObject
                | MessageType::MovementObjectUpdate
                | MessageType::MorphTargetUpdate
        )
    }
}
