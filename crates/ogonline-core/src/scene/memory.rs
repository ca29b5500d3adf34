use std::collections::{BTreeMap, HashMap};

use ogonline_proto::ObjectId;
use ogonline_proto::math::Vec3;
use ogonline_proto::messages::{CameraTransform, EntityKind, MovementObjectUpdate};

use super::{KeyState, ParamTarget, SceneGraph, ScriptParam};
use crate::interpolator::{InterpolationStep, TimeInterpolator};
use crate::message_ref::OnlineMessageRef;

/// Movement frames kept per object before the oldest are dropped.
const MAX_BUFFERED_FRAMES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub parent: ObjectId,
    pub bone_id: u32,
    pub mirrored: bool,
    /// Attached to an item slot rather than a bone.
    pub slot: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub kind: EntityKind,
    pub path: String,
    pub position: Vec3,
    pub enabled: bool,
    pub attachment: Option<Attachment>,
    pub script_params: BTreeMap<String, ScriptParam>,
    pub avatar: bool,
    pub controller: Option<i32>,
    pub created_on_the_fly: bool,
    pub movement_frames: Vec<OnlineMessageRef>,
    pub interpolator: TimeInterpolator,
    pub cut_lines: Vec<OnlineMessageRef>,
    pub morphs: HashMap<String, (f32, f32)>,
}

impl MemoryObject {
    fn new(kind: EntityKind, path: &str, position: Vec3) -> Self {
        Self {
            kind,
            path: path.to_owned(),
            position,
            enabled: true,
            attachment: None,
            script_params: BTreeMap::new(),
            avatar: false,
            controller: None,
            created_on_the_fly: false,
            movement_frames: Vec::new(),
            interpolator: TimeInterpolator::new(),
            cut_lines: Vec::new(),
            morphs: HashMap::new(),
        }
    }
}

/// Scene held entirely in memory.
///
/// Objects added with [`MemoryScene::spawn`] stand in for a level's own
/// content and survive [`SceneGraph::load_level`]; objects created through
/// the session are dropped when a level loads.
#[derive(Debug, Default)]
pub struct MemoryScene {
    objects: BTreeMap<ObjectId, MemoryObject>,
    next_id: ObjectId,
    level: Option<(String, String)>,
    level_params: BTreeMap<String, ScriptParam>,
    next_controller: i32,
    cameras: HashMap<i32, CameraTransform>,
    next_camera: i32,
    key_states: HashMap<(i32, String), KeyState>,
    level_messages: Vec<String>,
    load_count: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime-created objects get ids from `base` upward, so two scenes can
    /// be made to disagree on ids.
    pub fn with_id_base(base: ObjectId) -> Self {
        Self {
            next_id: base,
            ..Self::default()
        }
    }

    fn next_object_id(&mut self) -> ObjectId {
        while self.objects.contains_key(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Adds a level object with a fixed id.
    pub fn spawn_with_id(&mut self, id: ObjectId, kind: EntityKind) -> ObjectId {
        self.objects
            .insert(id, MemoryObject::new(kind, "", Vec3::ZERO));
        id
    }

    pub fn spawn(&mut self, kind: EntityKind) -> ObjectId {
        let id = self.next_object_id();
        self.spawn_with_id(id, kind)
    }

    pub fn spawn_avatar(&mut self, position: Vec3) -> ObjectId {
        let id = self.spawn(EntityKind::MovementObject);
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.avatar = true;
            obj.position = position;
        }
        id
    }

    /// Plays buffered movement frames up to the local wall time, moving each
    /// object between its two oldest frames.
    pub fn update_movement(&mut self, walltime: f32, timestep: f32) {
        for obj in self.objects.values_mut() {
            // Each pass either consumes a frame or stops.
            for _ in 0..=obj.movement_frames.len() {
                match obj.interpolator.update(walltime, timestep) {
                    InterpolationStep::NextFrame | InterpolationStep::Duplicate => {
                        obj.movement_frames.remove(0);
                        obj.interpolator.pop();
                    }
                    InterpolationStep::Interpolate => {
                        let t = obj.interpolator.interpolation_step();
                        let from = obj.movement_frames[0].get::<MovementObjectUpdate>();
                        let to = obj.movement_frames[1].get::<MovementObjectUpdate>();
                        if let (Some(from), Some(to)) = (from, to) {
                            obj.position = lerp(from.position, to.position, t);
                        }
                        break;
                    }
                    InterpolationStep::Resynced | InterpolationStep::Waiting => break,
                }
            }
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<&MemoryObject> {
        self.objects.get(&id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id)?.attachment.as_ref().map(|a| a.parent)
    }

    pub fn script_param(&self, target: ParamTarget, key: &str) -> Option<&ScriptParam> {
        self.params(target)?.get(key)
    }

    pub fn level(&self) -> Option<(&str, &str)> {
        self.level.as_ref().map(|(l, c)| (l.as_str(), c.as_str()))
    }

    pub fn load_count(&self) -> usize {
        self.load_count
    }

    pub fn camera(&self, id: i32) -> Option<&CameraTransform> {
        self.cameras.get(&id)
    }

    pub fn key_state(&self, controller_id: i32, binding: &str) -> Option<KeyState> {
        self.key_states
            .get(&(controller_id, binding.to_owned()))
            .copied()
    }

    pub fn level_messages(&self) -> &[String] {
        &self.level_messages
    }

    fn params(&self, target: ParamTarget) -> Option<&BTreeMap<String, ScriptParam>> {
        match target {
            ParamTarget::Level => Some(&self.level_params),
            ParamTarget::Object(id) => self.objects.get(&id).map(|o| &o.script_params),
        }
    }

    fn params_mut(&mut self, target: ParamTarget) -> Option<&mut BTreeMap<String, ScriptParam>> {
        match target {
            ParamTarget::Level => Some(&mut self.level_params),
            ParamTarget::Object(id) => self.objects.get_mut(&id).map(|o| &mut o.script_params),
        }
    }
}

impl SceneGraph for MemoryScene {
    fn object_kind(&self, id: ObjectId) -> Option<EntityKind> {
        self.objects.get(&id).map(|o| o.kind)
    }

    fn object_position(&self, id: ObjectId) -> Option<Vec3> {
        self.objects.get(&id).map(|o| o.position)
    }

    fn attach(&mut self, parent: ObjectId, child: ObjectId, bone_id: u32, mirrored: bool) -> bool {
        let Some(parent_kind) = self.object_kind(parent) else {
            return false;
        };
        let Some(child_obj) = self.objects.get_mut(&child) else {
            return false;
        };
        let slot = child_obj.kind == EntityKind::ItemObject && parent_kind == EntityKind::MovementObject;
        child_obj.attachment = Some(Attachment {
            parent,
            bone_id,
            mirrored,
            slot,
        });
        true
    }

    fn detach(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        match self.objects.get_mut(&child) {
            Some(obj) if obj.attachment.as_ref().is_some_and(|a| a.parent == parent) => {
                obj.attachment = None;
                true
            }
            _ => false,
        }
    }

    fn set_enabled(&mut self, id: ObjectId, enabled: bool) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn create_entity(&mut self, path: &str, position: Vec3) -> Option<ObjectId> {
        if path.is_empty() {
            return None;
        }
        let kind = if path.contains("Characters/") {
            EntityKind::MovementObject
        } else if path.contains("Items/") {
            EntityKind::ItemObject
        } else {
            EntityKind::EnvObject
        };
        let id = self.next_object_id();
        let mut obj = MemoryObject::new(kind, path, position);
        obj.avatar = kind == EntityKind::MovementObject;
        obj.created_on_the_fly = true;
        self.objects.insert(id, obj);
        Some(id)
    }

    fn remove_object(&mut self, id: ObjectId) -> bool {
        if self.objects.remove(&id).is_none() {
            return false;
        }
        for obj in self.objects.values_mut() {
            if obj.attachment.as_ref().is_some_and(|a| a.parent == id) {
                obj.attachment = None;
            }
        }
        true
    }

    fn set_script_param(&mut self, target: ParamTarget, key: &str, param: ScriptParam) -> bool {
        match self.params_mut(target) {
            Some(params) => {
                params.insert(key.to_owned(), param);
                true
            }
            None => false,
        }
    }

    fn remove_script_param(&mut self, target: ParamTarget, key: &str) -> bool {
        self.params_mut(target)
            .is_some_and(|params| params.remove(key).is_some())
    }

    fn rename_script_param(&mut self, target: ParamTarget, key: &str, new_key: &str) -> bool {
        let Some(params) = self.params_mut(target) else {
            return false;
        };
        match params.remove(key) {
            Some(param) => {
                params.insert(new_key.to_owned(), param);
                true
            }
            None => false,
        }
    }

    fn load_level(&mut self, level_name: &str, campaign_id: &str) -> bool {
        if level_name.is_empty() {
            return false;
        }
        self.objects.retain(|_, o| !o.created_on_the_fly);
        for obj in self.objects.values_mut() {
            obj.movement_frames.clear();
            obj.interpolator.clear();
            obj.cut_lines.clear();
            obj.controller = None;
        }
        self.level = Some((level_name.to_owned(), campaign_id.to_owned()));
        self.load_count += 1;
        true
    }

    fn avatar_ids(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.avatar)
            .map(|(id, _)| *id)
            .collect()
    }

    fn set_remote_controlled(&mut self, id: ObjectId, controller_id: Option<i32>) {
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.controller = controller_id;
        }
    }

    fn created_on_the_fly(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|o| o.created_on_the_fly)
    }

    fn allocate_controller(&mut self) -> i32 {
        self.next_controller += 1;
        self.next_controller
    }

    fn create_camera(&mut self) -> i32 {
        self.next_camera += 1;
        self.next_camera
    }

    fn set_camera_transform(&mut self, camera_id: i32, transform: &CameraTransform) {
        self.cameras.insert(camera_id, transform.clone());
    }

    fn set_key_state(&mut self, controller_id: i32, binding: &str, state: KeyState) {
        self.key_states
            .insert((controller_id, binding.to_owned()), state);
    }

    fn movement_frames(&self, id: ObjectId) -> &[OnlineMessageRef] {
        self.objects
            .get(&id)
            .map(|o| o.movement_frames.as_slice())
            .unwrap_or(&[])
    }

    fn push_movement_frame(&mut self, id: ObjectId, frame: OnlineMessageRef) -> bool {
        let Some(obj) = self.objects.get_mut(&id) else {
            return false;
        };
        let host_walltime = frame
            .get::<MovementObjectUpdate>()
            .map_or(0.0, |f| f.host_walltime);
        obj.movement_frames.push(frame);
        obj.interpolator.push(host_walltime);
        if obj.movement_frames.len() > MAX_BUFFERED_FRAMES {
            obj.movement_frames.remove(0);
            obj.interpolator.pop();
        }
        true
    }

    fn push_cut_line(&mut self, id: ObjectId, cut: OnlineMessageRef) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.cut_lines.push(cut);
                true
            }
            None => false,
        }
    }

    fn set_morph_target(&mut self, id: ObjectId, name: &str, disp_weight: f32, mod_weight: f32) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.morphs.insert(name.to_owned(), (disp_weight, mod_weight));
                true
            }
            None => false,
        }
    }

    fn receive_level_message(&mut self, msg: &str) {
        self.level_messages.push(msg.to_owned());
    }
}

fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let [ax, ay, az] = a.to_array();
    let [bx, by, bz] = b.to_array();
    Vec3::new(ax + (bx - ax) * t, ay + (by - ay) * t, az + (bz - az) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ScriptParamValue;

    fn frame(object_id: ObjectId, host_walltime: f32, x: f32) -> OnlineMessageRef {
        OnlineMessageRef::new(MovementObjectUpdate {
            object_id,
            timestamp: host_walltime,
            host_walltime,
            position: Vec3::new(x, 0.0, 0.0),
            ..MovementObjectUpdate::default()
        })
    }

    #[test]
    fn movement_plays_back_against_host_clock() {
        let mut scene = MemoryScene::new();
        let id = scene.spawn(EntityKind::MovementObject);
        for (i, t) in [0.0, 1.0, 2.0].into_iter().enumerate() {
            assert!(scene.push_movement_frame(id, frame(id, t, i as f32 * 10.0)));
        }

        scene.update_movement(1.5, 0.0);
        let obj = scene.object(id).unwrap();
        assert_eq!(obj.movement_frames.len(), 2);
        assert_eq!(obj.interpolator.len(), 2);
        assert!((obj.position.to_array()[0] - 15.0).abs() < 1e-4);
    }

    #[test]
    fn cut_lines_need_an_object() {
        let mut scene = MemoryScene::new();
        let id = scene.spawn(EntityKind::MovementObject);
        let cut = OnlineMessageRef::new(ogonline_proto::messages::CutLine::default());
        assert!(scene.push_cut_line(id, cut.clone()));
        assert!(!scene.push_cut_line(id + 1, cut));
        assert_eq!(scene.object(id).unwrap().cut_lines.len(), 1);
    }

    #[test]
    fn items_attach_to_slots() {
        let mut scene = MemoryScene::new();
        let character = scene.spawn(EntityKind::MovementObject);
        let sword = scene.spawn(EntityKind::ItemObject);
        let crate_ = scene.spawn(EntityKind::EnvObject);

        assert!(scene.attach(character, sword, 2, true));
        assert!(scene.attach(character, crate_, 5, false));
        assert!(scene.object(sword).and_then(|o| o.attachment.as_ref()).is_some_and(|a| a.slot));
        assert!(!scene.object(crate_).and_then(|o| o.attachment.as_ref()).is_some_and(|a| a.slot));

        assert!(!scene.detach(crate_, sword));
        assert!(scene.detach(character, sword));
        assert_eq!(scene.parent_of(sword), None);
    }

    #[test]
    fn loading_drops_runtime_objects_only() {
        let mut scene = MemoryScene::with_id_base(100);
        let base = scene.spawn_with_id(1, EntityKind::EnvObject);
        let spawned = scene
            .create_entity("Data/Characters/rabbit.xml", Vec3::ZERO)
            .unwrap();
        assert_eq!(spawned, 100);
        assert!(scene.created_on_the_fly(spawned));

        assert!(scene.load_level("arena", ""));
        assert!(scene.object(base).is_some());
        assert!(scene.object(spawned).is_none());
        assert_eq!(scene.level(), Some(("arena", "")));
    }

    #[test]
    fn script_params_rename_and_remove() {
        let mut scene = MemoryScene::new();
        let param = ScriptParam {
            value: ScriptParamValue::Int(3),
            editor_type: 0,
            editor_details: String::new(),
        };
        assert!(scene.set_script_param(ParamTarget::Level, "lives", param.clone()));
        assert!(!scene.set_script_param(ParamTarget::Object(77), "lives", param.clone()));
        assert!(scene.rename_script_param(ParamTarget::Level, "lives", "Lives"));
        assert_eq!(scene.script_param(ParamTarget::Level, "Lives"), Some(&param));
        assert!(scene.remove_script_param(ParamTarget::Level, "Lives"));
        assert!(!scene.remove_script_param(ParamTarget::Level, "Lives"));
    }
}
