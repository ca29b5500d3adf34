//! Player bookkeeping, chat and liveness messages.

use crate::category::MessageCategory;
use crate::ids::{INVALID_OBJECT_ID, INVALID_PLAYER_ID, ObjectId, PlayerId};
use crate::messages::Message;
use crate::value::{FieldReader, Object};

/// Everything the session knows about one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub player_name: String,
    /// Avatar the player controls, or `INVALID_OBJECT_ID` when none.
    pub object_id: ObjectId,
    pub controller_id: i32,
    pub camera_id: i32,
    /// Last measured round trip in milliseconds.
    pub ping: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            player_id: INVALID_PLAYER_ID,
            player_name: String::new(),
            object_id: INVALID_OBJECT_ID,
            controller_id: -1,
            camera_id: -1,
            ping: 0,
        }
    }
}

/// Host → all: create or replace a player's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetPlayerState {
    pub state: PlayerState,
}

impl Message for SetPlayerState {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        let s = &self.state;
        Object::new()
            .with("player_id", s.player_id)
            .with("player_name", s.player_name.as_str())
            .with("object_id", s.object_id)
            .with("controller_id", s.controller_id)
            .with("camera_id", s.camera_id)
            .with("ping", s.ping)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        let s = &mut self.state;
        r.i32("player_id", &mut s.player_id);
        r.string("player_name", &mut s.player_name);
        r.i32("object_id", &mut s.object_id);
        r.i32("controller_id", &mut s.controller_id);
        r.i32("camera_id", &mut s.camera_id);
        r.u32("ping", &mut s.ping);
    }
}

/// Host → all: a player left.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovePlayerState {
    pub player_id: PlayerId,
}

impl Default for RemovePlayerState {
    fn default() -> Self {
        Self {
            player_id: INVALID_PLAYER_ID,
        }
    }
}

impl Message for RemovePlayerState {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("player_id", self.player_id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("player_id", &mut self.player_id);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatEntry {
    pub text: String,
}

impl Message for ChatEntry {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("text", self.text.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.string("text", &mut self.text);
    }
}

/// Host-controlled switches mirrored to every client.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::FromRepr)]
pub enum OnlineFlag {
    AllowsEditor = 0,
    HighFiveEnabled = 1,
}

/// Host → all: one session flag changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSessionFlag {
    pub flag: u8,
    pub value: bool,
}

impl Message for HostSessionFlag {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("flag", self.flag).with("value", self.value)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.u8("flag", &mut self.flag);
        r.bool("value", &mut self.value);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ping {
    pub id: u32,
}

impl Message for Ping {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("id", self.id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.u32("id", &mut self.id);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pong {
    pub id: u32,
}

impl Message for Pong {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("id", self.id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.u32("id", &mut self.id);
    }
}
