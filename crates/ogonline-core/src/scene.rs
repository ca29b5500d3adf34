//! The game world as the session sees it.
//!
//! Message handlers only mutate the world through [`SceneGraph`], so the
//! session can run against a real engine or the in-memory [`memory::MemoryScene`].

use ogonline_proto::ObjectId;
use ogonline_proto::ids::INVALID_OBJECT_ID;
use ogonline_proto::math::Vec3;
use ogonline_proto::messages::{CameraTransform, EntityKind};

use crate::message_ref::OnlineMessageRef;

pub mod memory;

/// Owner of a script parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamTarget {
    Level,
    Object(ObjectId),
}

impl ParamTarget {
    /// `INVALID_OBJECT_ID` on the wire addresses the level itself.
    pub fn from_wire(param_id: ObjectId) -> Self {
        if param_id == INVALID_OBJECT_ID {
            ParamTarget::Level
        } else {
            ParamTarget::Object(param_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptParamValue {
    Int(i32),
    Float(f32),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParam {
    pub value: ScriptParamValue,
    pub editor_type: u8,
    pub editor_details: String,
}

/// Pressed state of one input binding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyState {
    pub depth: f32,
    pub depth_count: i32,
    pub count: i32,
}

pub trait SceneGraph {
    fn object_kind(&self, id: ObjectId) -> Option<EntityKind>;

    fn object_position(&self, id: ObjectId) -> Option<Vec3>;

    /// Attaches `child` to `parent`. Items go to attachment slot `bone_id`,
    /// anything else to the bone with that id.
    fn attach(&mut self, parent: ObjectId, child: ObjectId, bone_id: u32, mirrored: bool) -> bool;

    fn detach(&mut self, parent: ObjectId, child: ObjectId) -> bool;

    fn set_enabled(&mut self, id: ObjectId, enabled: bool) -> bool;

    fn create_entity(&mut self, path: &str, position: Vec3) -> Option<ObjectId>;

    fn remove_object(&mut self, id: ObjectId) -> bool;

    fn set_script_param(&mut self, target: ParamTarget, key: &str, param: ScriptParam) -> bool;

    fn remove_script_param(&mut self, target: ParamTarget, key: &str) -> bool;

    fn rename_script_param(&mut self, target: ParamTarget, key: &str, new_key: &str) -> bool;

    /// Loads a level synchronously. Returns false when it is not available.
    fn load_level(&mut self, level_name: &str, campaign_id: &str) -> bool;

    /// Characters a player could be given, in a stable order.
    fn avatar_ids(&self) -> Vec<ObjectId>;

    /// Hands an avatar to a remote controller, or back to local control.
    fn set_remote_controlled(&mut self, id: ObjectId, controller_id: Option<i32>);

    /// Whether the object was spawned at runtime rather than loaded with the level.
    fn created_on_the_fly(&self, id: ObjectId) -> bool;

    fn allocate_controller(&mut self) -> i32;

    fn create_camera(&mut self) -> i32;

    fn set_camera_transform(&mut self, camera_id: i32, transform: &CameraTransform);

    fn set_key_state(&mut self, controller_id: i32, binding: &str, state: KeyState);

    /// Buffered movement frames for an object, oldest first.
    fn movement_frames(&self, id: ObjectId) -> &[OnlineMessageRef];

    fn push_movement_frame(&mut self, id: ObjectId, frame: OnlineMessageRef) -> bool;

    /// Queues a received cut on a movement object.
    fn push_cut_line(&mut self, id: ObjectId, cut: OnlineMessageRef) -> bool;

    fn set_morph_target(&mut self, id: ObjectId, name: &str, disp_weight: f32, mod_weight: f32) -> bool;

    fn receive_level_message(&mut self, msg: &str);
}
