//! Scene mutations and per-frame state.

use tracing::warn;

use crate::category::{Delivery, MessageCategory};
use crate::constants::{MAX_MORPH_NAME_LEN, MAX_NETWORK_BONES};
use crate::ids::{INVALID_OBJECT_ID, ObjectId};
use crate::math::{Mat4, Vec3};
use crate::messages::Message;
use crate::value::{FieldReader, Object, Value};

/// Kind of a scene object, as far as the session cares.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::FromRepr)]
pub enum EntityKind {
    #[default]
    Other = 0,
    EnvObject = 1,
    MovementObject = 2,
    ItemObject = 3,
    Hotspot = 4,
}

impl EntityKind {
    /// Kinds whose removal is mirrored to peers.
    pub const fn is_network_removable(self) -> bool {
        matches!(
            self,
            EntityKind::EnvObject | EntityKind::MovementObject | EntityKind::ItemObject | EntityKind::Hotspot
        )
    }
}

/// Attach or detach `child_id` to `parent_id`.
///
/// Items attach to an attachment slot, anything else to a bone.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachTo {
    pub parent_id: ObjectId,
    pub child_id: ObjectId,
    pub bone_id: u32,
    pub attach: bool,
    pub mirrored: bool,
}

impl Default for AttachTo {
    fn default() -> Self {
        Self {
            parent_id: INVALID_OBJECT_ID,
            child_id: INVALID_OBJECT_ID,
            bone_id: 0,
            attach: true,
            mirrored: false,
        }
    }
}

impl Message for AttachTo {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("parent_id", self.parent_id)
            .with("child_id", self.child_id)
            .with("bone_id", self.bone_id)
            .with("attach", self.attach)
            .with("mirrored", self.mirrored)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("parent_id", &mut self.parent_id);
        r.i32("child_id", &mut self.child_id);
        r.u32("bone_id", &mut self.bone_id);
        r.bool("attach", &mut self.attach);
        r.bool("mirrored", &mut self.mirrored);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetObjectEnabled {
    pub object_id: ObjectId,
    pub enabled: bool,
}

impl Default for SetObjectEnabled {
    fn default() -> Self {
        Self {
            object_id: INVALID_OBJECT_ID,
            enabled: true,
        }
    }
}

impl Message for SetObjectEnabled {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("object_id", self.object_id)
            .with("enabled", self.enabled)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("object_id", &mut self.object_id);
        r.bool("enabled", &mut self.enabled);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveObject {
    pub object_id: ObjectId,
    pub kind: EntityKind,
}

impl Default for RemoveObject {
    fn default() -> Self {
        Self {
            object_id: INVALID_OBJECT_ID,
            kind: EntityKind::Other,
        }
    }
}

impl Message for RemoveObject {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("object_id", self.object_id)
            .with("kind", self.kind as u8)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("object_id", &mut self.object_id);
        let mut kind = 0u8;
        if r.u8("kind", &mut kind) {
            match EntityKind::from_repr(kind) {
                Some(k) => self.kind = k,
                None => r.mark_invalid("kind"),
            }
        }
    }
}

/// Host → all: spawn an entity from `path`. `object_id` is the id the host
/// gave it; receivers map it to whatever id their scene assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEntity {
    pub path: String,
    pub position: Vec3,
    pub object_id: ObjectId,
}

impl Default for CreateEntity {
    fn default() -> Self {
        Self {
            path: String::new(),
            position: Vec3::ZERO,
            object_id: INVALID_OBJECT_ID,
        }
    }
}

impl Message for CreateEntity {
    const CATEGORY: MessageCategory = MessageCategory::LevelPersistent;

    fn serialize(&self) -> Object {
        Object::new()
            .with("path", self.path.as_str())
            .with("position", self.position)
            .with("object_id", self.object_id)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.string("path", &mut self.path);
        r.vec3("position", &mut self.position);
        r.i32("object_id", &mut self.object_id);
    }
}

/// Client → host: where the client's camera is looking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraTransform {
    pub position: Vec3,
    pub flat_facing: Vec3,
    pub facing: Vec3,
    pub up: Vec3,
    pub x_rotation: f32,
    pub y_rotation: f32,
}

impl Message for CameraTransform {
    const CATEGORY: MessageCategory = MessageCategory::Transient;
    const DELIVERY: Delivery = Delivery::Unreliable;

    fn serialize(&self) -> Object {
        Object::new()
            .with("position", self.position)
            .with("flat_facing", self.flat_facing)
            .with("facing", self.facing)
            .with("up", self.up)
            .with("x_rotation", self.x_rotation)
            .with("y_rotation", self.y_rotation)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.vec3("position", &mut self.position);
        r.vec3("flat_facing", &mut self.flat_facing);
        r.vec3("facing", &mut self.facing);
        r.vec3("up", &mut self.up);
        r.f32("x_rotation", &mut self.x_rotation);
        r.f32("y_rotation", &mut self.y_rotation);
    }
}

/// Host → all: one animation frame of a movement object.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementObjectUpdate {
    pub object_id: ObjectId,
    pub timestamp: f32,
    pub host_walltime: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub facing: Vec3,
    /// At most `MAX_NETWORK_BONES` entries.
    pub bones: Vec<Mat4>,
}

impl Default for MovementObjectUpdate {
    fn default() -> Self {
        Self {
            object_id: INVALID_OBJECT_ID,
            timestamp: 0.0,
            host_walltime: 0.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            facing: Vec3::ZERO,
            bones: Vec::new(),
        }
    }
}

impl Message for MovementObjectUpdate {
    const CATEGORY: MessageCategory = MessageCategory::LevelTransient;
    const DELIVERY: Delivery = Delivery::Unreliable;

    fn serialize(&self) -> Object {
        if self.bones.len() > MAX_NETWORK_BONES {
            warn!(
                object = self.object_id,
                bones = self.bones.len(),
                max = MAX_NETWORK_BONES,
                "movement frame has too many bones, sending the first ones only"
            );
        }
        let bones = self
            .bones
            .iter()
            .take(MAX_NETWORK_BONES)
            .map(|m| Value::from(*m))
            .collect::<Vec<_>>();
        Object::new()
            .with("object_id", self.object_id)
            .with("timestamp", self.timestamp)
            .with("host_walltime", self.host_walltime)
            .with("position", self.position)
            .with("velocity", self.velocity)
            .with("facing", self.facing)
            .with("bones", bones)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("object_id", &mut self.object_id);
        r.f32("timestamp", &mut self.timestamp);
        r.f32("host_walltime", &mut self.host_walltime);
        r.vec3("position", &mut self.position);
        r.vec3("velocity", &mut self.velocity);
        r.vec3("facing", &mut self.facing);
        if let Some(list) = r.list("bones") {
            if list.len() > MAX_NETWORK_BONES {
                r.mark_invalid("bones");
                return;
            }
            match list.iter().map(Value::as_mat4).collect::<Option<Vec<_>>>() {
                Some(bones) => self.bones = bones,
                None => r.mark_invalid("bones"),
            }
        }
    }
}

/// Host → all: morph target weights of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTargetUpdate {
    pub object_id: ObjectId,
    pub name: String,
    pub disp_weight: f32,
    pub mod_weight: f32,
}

impl Default for MorphTargetUpdate {
    fn default() -> Self {
        Self {
            object_id: INVALID_OBJECT_ID,
            name: String::new(),
            disp_weight: 0.0,
            mod_weight: 0.0,
        }
    }
}

impl Message for MorphTargetUpdate {
    const CATEGORY: MessageCategory = MessageCategory::LevelTransient;
    const DELIVERY: Delivery = Delivery::Unreliable;

    fn serialize(&self) -> Object {
        Object::new()
            .with("object_id", self.object_id)
            .with("name", self.name.as_str())
            .with("disp_weight", self.disp_weight)
            .with("mod_weight", self.mod_weight)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("object_id", &mut self.object_id);
        if r.string("name", &mut self.name) && self.name.len() > MAX_MORPH_NAME_LEN {
            let mut end = MAX_MORPH_NAME_LEN;
            while !self.name.is_char_boundary(end) {
                end -= 1;
            }
            self.name.truncate(end);
        }
        r.f32("disp_weight", &mut self.disp_weight);
        r.f32("mod_weight", &mut self.mod_weight);
    }
}

/// Client → host: state change of one input binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerInput {
    pub binding_id: u8,
    pub depth: f32,
    pub depth_count: i32,
    pub count: i32,
}

impl Message for PlayerInput {
    const CATEGORY: MessageCategory = MessageCategory::Transient;

    fn serialize(&self) -> Object {
        Object::new()
            .with("binding_id", self.binding_id)
            .with("depth", self.depth)
            .with("depth_count", self.depth_count)
            .with("count", self.count)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.u8("binding_id", &mut self.binding_id);
        r.f32("depth", &mut self.depth);
        r.i32("depth_count", &mut self.depth_count);
        r.i32("count", &mut self.count);
    }
}

/// Free-form level script message relayed to every peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelMessage {
    pub msg: String,
}

impl Message for LevelMessage {
    const CATEGORY: MessageCategory = MessageCategory::LevelTransient;

    fn serialize(&self) -> Object {
        Object::new().with("msg", self.msg.as_str())
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.string("msg", &mut self.msg);
    }
}

/// A cut across a movement object, e.g. from a blade.
///
/// Buffered on the target object like movement frames.
#[derive(Debug, Clone, PartialEq)]
pub struct CutLine {
    pub object_id: ObjectId,
    pub points: [Vec3; 3],
    pub position: Vec3,
    pub normal: Vec3,
    pub dir: Vec3,
    pub cut_type: i32,
    pub depth: i32,
    pub num_hit: i32,
    pub hit_list: Vec<i32>,
}

impl Default for CutLine {
    fn default() -> Self {
        Self {
            object_id: INVALID_OBJECT_ID,
            points: [Vec3::ZERO; 3],
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            dir: Vec3::ZERO,
            cut_type: 0,
            depth: 0,
            num_hit: 0,
            hit_list: Vec::new(),
        }
    }
}

impl Message for CutLine {
    const CATEGORY: MessageCategory = MessageCategory::LevelTransient;

    fn serialize(&self) -> Object {
        let hit_list = self
            .hit_list
            .iter()
            .map(|h| Value::Int32(*h))
            .collect::<Vec<_>>();
        Object::new()
            .with("object_id", self.object_id)
            .with("p0", self.points[0])
            .with("p1", self.points[1])
            .with("p2", self.points[2])
            .with("pos", self.position)
            .with("normal", self.normal)
            .with("dir", self.dir)
            .with("cut_type", self.cut_type)
            .with("depth", self.depth)
            .with("num_hit", self.num_hit)
            .with("hit_list", hit_list)
    }

    fn deserialize(&mut self, r: &mut FieldReader<'_>) {
        r.i32("object_id", &mut self.object_id);
        let [p0, p1, p2] = &mut self.points;
        r.vec3("p0", p0);
        r.vec3("p1", p1);
        r.vec3("p2", p2);
        r.vec3("pos", &mut self.position);
        r.vec3("normal", &mut self.normal);
        r.vec3("dir", &mut self.dir);
        r.i32("cut_type", &mut self.cut_type);
        r.i32("depth", &mut self.depth);
        r.i32("num_hit", &mut self.num_hit);
        if let Some(list) = r.list("hit_list") {
            match list.iter().map(Value::as_i32).collect::<Option<Vec<_>>>() {
                Some(hits) => self.hit_list = hits,
                None => r.mark_invalid("hit_list"),
            }
        }
    }
}
