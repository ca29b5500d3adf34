//! Identifier types shared across the session.

/// Transport-level connection handle.
pub type ConnId = u64;

/// Session-level peer identifier. On a client the host is always peer 0.
pub type PeerId = u32;

/// Player identifier. The host's own player uses [`HOST_PLAYER_ID`].
pub type PlayerId = i32;

/// Scene object identifier.
pub type ObjectId = i32;

pub const HOST_PEER_ID: PeerId = 0;
pub const HOST_PLAYER_ID: PlayerId = -1;

/// Sentinel for "no player", the value of a player id that never arrived.
pub const INVALID_PLAYER_ID: PlayerId = PlayerId::MIN;

/// Sentinel for "no object". Script param messages also use it to address
/// the level's own parameter set.
pub const INVALID_OBJECT_ID: ObjectId = -1;

/// Players are keyed by the peer they arrived on.
pub fn player_id_for_peer(peer_id: PeerId) -> PlayerId {
    peer_id as PlayerId
}
