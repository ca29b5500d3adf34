use ogonline_proto::messages::AttachTo;
use ogonline_proto::PeerId;
use tracing::warn;

use crate::message_ref::OnlineMessageRef;
use crate::registry::{ExecuteContext, Handler};

/// Attaches or detaches two objects addressed by their wire ids.
pub struct AttachToHandler;

impl Handler<AttachTo> for AttachToHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &AttachTo, _: &OnlineMessageRef, _: PeerId) {
        let parent = ctx.online.object_id(message.parent_id);
        let child = ctx.online.object_id(message.child_id);
        if ctx.scene.object_kind(parent).is_none() || ctx.scene.object_kind(child).is_none() {
            warn!(
                parent = message.parent_id,
                child = message.child_id,
                "attach target does not exist"
            );
            return;
        }
        if parent == child {
            warn!(object = parent, "cannot attach an object to itself");
            return;
        }

        let applied = if message.attach {
            ctx.scene
                .attach(parent, child, message.bone_id, message.mirrored)
        } else {
            ctx.scene.detach(parent, child)
        };
        if !applied {
            warn!(parent, child, attach = message.attach, "attach change rejected by scene");
        }
    }
}
