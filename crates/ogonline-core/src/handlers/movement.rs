use ogonline_proto::ids::player_id_for_peer;
use ogonline_proto::messages::{
    CameraTransform, CutLine, EntityKind, LevelMessage, MorphTargetUpdate, MovementObjectUpdate, PlayerInput,
};
use ogonline_proto::PeerId;
use tracing::{debug, warn};

use crate::message_ref::OnlineMessageRef;
use crate::registry::{ExecuteContext, Handler};
use crate::scene::KeyState;

/// Client: buffers a host movement frame for interpolation.
///
/// The envelope itself is stored, so a frame is shared with the receive path
/// rather than copied.
pub struct MovementObjectUpdateHandler;

impl Handler<MovementObjectUpdate> for MovementObjectUpdateHandler {
    fn execute(
        &self,
        ctx: &mut ExecuteContext<'_>,
        message: &MovementObjectUpdate,
        message_ref: &OnlineMessageRef,
        _: PeerId,
    ) {
        if ctx.online.is_hosting() {
            return;
        }
        if !ctx.online.host_started_level() {
            debug!(object = message.object_id, "movement before level start");
            return;
        }
        let id = ctx.online.object_id(message.object_id);
        if ctx.scene.object_kind(id) != Some(EntityKind::MovementObject) {
            warn!(object = message.object_id, "movement for unknown object");
            return;
        }
        let duplicate = ctx.scene.movement_frames(id).iter().any(|frame| {
            frame
                .get::<MovementObjectUpdate>()
                .is_some_and(|f| f.timestamp == message.timestamp)
        });
        if duplicate {
            warn!(object = id, timestamp = message.timestamp, "duplicate movement frame");
            return;
        }
        ctx.scene.push_movement_frame(id, message_ref.clone());
    }
}

pub struct MorphTargetUpdateHandler;

impl Handler<MorphTargetUpdate> for MorphTargetUpdateHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &MorphTargetUpdate, _: &OnlineMessageRef, _: PeerId) {
        if ctx.online.is_hosting() {
            return;
        }
        let id = ctx.online.object_id(message.object_id);
        if !ctx
            .scene
            .set_morph_target(id, &message.name, message.disp_weight, message.mod_weight)
        {
            warn!(object = message.object_id, morph = %message.name, "morph target skipped");
        }
    }
}

/// Host: moves the camera belonging to the sending player.
pub struct CameraTransformHandler;

impl Handler<CameraTransform> for CameraTransformHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &CameraTransform, _: &OnlineMessageRef, from: PeerId) {
        if !ctx.online.is_hosting() {
            return;
        }
        match ctx.online.player_state(player_id_for_peer(from)) {
            Some(state) => ctx.scene.set_camera_transform(state.camera_id, message),
            None => warn!(peer_id = from, "camera from peer without a player"),
        }
    }
}

/// Host: applies a client's binding to its controller.
pub struct PlayerInputHandler;

impl Handler<PlayerInput> for PlayerInputHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &PlayerInput, _: &OnlineMessageRef, from: PeerId) {
        if !ctx.online.is_hosting() {
            return;
        }
        let Some(state) = ctx.online.player_state(player_id_for_peer(from)) else {
            warn!(peer_id = from, "input from peer without a player");
            return;
        };
        let binding = ctx
            .online
            .session()
            .and_then(|s| s.bindings.lock().name(message.binding_id).map(str::to_owned));
        let Some(binding) = binding else {
            warn!(binding_id = message.binding_id, "unknown binding id");
            return;
        };
        ctx.scene.set_key_state(
            state.controller_id,
            &binding,
            KeyState {
                depth: message.depth,
                depth_count: message.depth_count,
                count: message.count,
            },
        );
    }
}

/// Queues a cut on the target movement object. The envelope is shared, not copied.
pub struct CutLineHandler;

impl Handler<CutLine> for CutLineHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &CutLine, message_ref: &OnlineMessageRef, _: PeerId) {
        let id = ctx.online.object_id(message.object_id);
        if ctx.scene.object_kind(id) != Some(EntityKind::MovementObject) {
            warn!(object = message.object_id, "cut line for unknown object");
            return;
        }
        ctx.scene.push_cut_line(id, message_ref.clone());
    }
}

pub struct LevelMessageHandler;

impl Handler<LevelMessage> for LevelMessageHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &LevelMessage, _: &OnlineMessageRef, _: PeerId) {
        ctx.scene.receive_level_message(&message.msg);
    }
}
