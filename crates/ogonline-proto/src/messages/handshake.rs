//! Messages exchanged while a peer is being admitted.

use crate::category::MessageCategory;
use crate::ids::PlayerId;
use crate::messages::Message;
use crate::value::{FieldReader, Object, Value};

/// Host → client: first message on a new connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildVersionRequest {
    pub host_build_id: i32,
}

impl Message for BuildVersionRequest {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("host_build_id", self.host_build_id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("host_build_id", &mut self.host_build_id);
    }
}

/// Client → host: the client's build id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildVersion {
    pub build_id: i32,
}

impl Message for BuildVersion {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("build_id", self.build_id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("build_id", &mut self.build_id);
    }
}

/// Host → client: input binding table and session flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionParameters {
    /// Binding name and the id it is sent as in [`crate::messages::PlayerInput`].
    pub bindings: Vec<(String, u8)>,
    pub host_session_flags: Vec<(u8, bool)>,
}

impl Message for SessionParameters {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        let bindings = self
            .bindings
            .iter()
            .map(|(name, id)| Value::Object(Object::new().with("name", name.as_str()).with("id", *id)))
            .collect::<Vec<_>>();
        let flags = self
            .host_session_flags
            .iter()
            .map(|(flag, value)| Value::Object(Object::new().with("flag", *flag).with("value", *value)))
            .collect::<Vec<_>>();
        Object::new().with("bindings", bindings).with("flags", flags)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        if let Some(list) = r.list("bindings") {
            self.bindings = list
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|o| {
                    let name = o.get("name")?.as_str()?.to_owned();
                    let id = o.get("id")?.as_u8()?;
                    Some((name, id))
                })
                .collect();
        }
        if let Some(list) = r.list("flags") {
            self.host_session_flags = list
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|o| Some((o.get("flag")?.as_u8()?, o.get("value")?.as_bool()?)))
                .collect();
        }
    }
}

/// Client → host: who is joining and with which mods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientParameters {
    pub player_name: String,
    pub active_mods: String,
}

impl Message for ClientParameters {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new()
            .with("player_name", self.player_name.as_str())
            .with("active_mods", self.active_mods.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.string("player_name", &mut self.player_name);
        r.string("active_mods", &mut self.active_mods);
    }
}

/// Host → client: which level to load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileTransferMetadata {
    pub level_name: String,
    pub campaign_id: String,
}

impl Message for FileTransferMetadata {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new()
            .with("level_name", self.level_name.as_str())
            .with("campaign_id", self.campaign_id.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.string("level_name", &mut self.level_name);
        r.string("campaign_id", &mut self.campaign_id);
    }
}

/// Sent by a client once its level is loaded, and broadcast by the host when
/// a player becomes active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadingCompleted;

impl Message for LoadingCompleted {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new()
    }

    fn deserialize(&mut self, _r: &mut FieldReader<'_>) {}
}

/// Host → client: the player id the client controls.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignPlayerId {
    pub player_id: PlayerId,
}

impl Default for AssignPlayerId {
    fn default() -> Self {
        Self {
            player_id: crate::ids::INVALID_PLAYER_ID,
        }
    }
}

impl Message for AssignPlayerId {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new().with("player_id", self.player_id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("player_id", &mut self.player_id);
    }
}
