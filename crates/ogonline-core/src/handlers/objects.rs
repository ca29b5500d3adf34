use ogonline_proto::messages::{CreateEntity, RemoveObject, SetObjectEnabled};
use ogonline_proto::PeerId;
use tracing::{debug, warn};

use crate::message_ref::OnlineMessageRef;
use crate::registry::{ExecuteContext, Handler};

pub struct SetObjectEnabledHandler;

impl Handler<SetObjectEnabled> for SetObjectEnabledHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &SetObjectEnabled, _: &OnlineMessageRef, _: PeerId) {
        let id = ctx.online.object_id(message.object_id);
        if !ctx.scene.set_enabled(id, message.enabled) {
            warn!(object = message.object_id, "enable target missing");
        }
    }
}

pub struct RemoveObjectHandler;

impl Handler<RemoveObject> for RemoveObjectHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &RemoveObject, _: &OnlineMessageRef, _: PeerId) {
        if ctx.online.is_hosting() {
            return;
        }
        let id = ctx.online.object_id(message.object_id);
        match ctx.scene.object_kind(id) {
            Some(kind) if kind.is_network_removable() => {
                ctx.scene.remove_object(id);
                ctx.online.deregister_object_id(id);
            }
            Some(kind) => warn!(object = message.object_id, ?kind, "object kind cannot be removed remotely"),
            None => debug!(object = message.object_id, "object already gone"),
        }
    }
}

/// Client: spawns the host's entity and remembers which id the host uses for it.
pub struct CreateEntityHandler;

impl Handler<CreateEntity> for CreateEntityHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &CreateEntity, _: &OnlineMessageRef, _: PeerId) {
        if ctx.online.is_hosting() {
            return;
        }
        match ctx.scene.create_entity(&message.path, message.position) {
            Some(local) => ctx.online.register_object_id(message.object_id, local),
            None => warn!(path = %message.path, "failed to create entity"),
        }
    }
}
