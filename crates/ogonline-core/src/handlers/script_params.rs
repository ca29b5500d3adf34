use ogonline_proto::messages::{NumericParam, ScriptParamRemove, ScriptParamRename, ScriptParamString, ScriptParamUnion};
use ogonline_proto::{ObjectId, PeerId};
use tracing::warn;

use crate::message_ref::OnlineMessageRef;
use crate::online::Online;
use crate::registry::{ExecuteContext, Handler};
use crate::scene::{ParamTarget, ScriptParam, ScriptParamValue};

fn target(online: &Online, param_id: ObjectId) -> ParamTarget {
    match ParamTarget::from_wire(param_id) {
        ParamTarget::Level => ParamTarget::Level,
        ParamTarget::Object(id) => ParamTarget::Object(online.object_id(id)),
    }
}

pub struct ScriptParamStringHandler;

impl Handler<ScriptParamString> for ScriptParamStringHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &ScriptParamString, _: &OnlineMessageRef, _: PeerId) {
        let target = target(ctx.online, message.param_id);
        let param = ScriptParam {
            value: ScriptParamValue::String(message.value.clone()),
            editor_type: message.editor_type,
            editor_details: message.editor_details.clone(),
        };
        if !ctx.scene.set_script_param(target, &message.key, param) {
            warn!(?target, key = %message.key, "script param owner missing");
        }
    }
}

pub struct ScriptParamUnionHandler;

impl Handler<ScriptParamUnion> for ScriptParamUnionHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &ScriptParamUnion, _: &OnlineMessageRef, _: PeerId) {
        let target = target(ctx.online, message.param_id);
        let value = match message.value {
            NumericParam::Int(v) => ScriptParamValue::Int(v),
            NumericParam::Float(v) => ScriptParamValue::Float(v),
        };
        let param = ScriptParam {
            value,
            editor_type: message.editor_type,
            editor_details: message.editor_details.clone(),
        };
        if !ctx.scene.set_script_param(target, &message.key, param) {
            warn!(?target, key = %message.key, "script param owner missing");
        }
    }
}

pub struct ScriptParamRemoveHandler;

impl Handler<ScriptParamRemove> for ScriptParamRemoveHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &ScriptParamRemove, _: &OnlineMessageRef, _: PeerId) {
        let target = target(ctx.online, message.param_id);
        ctx.scene.remove_script_param(target, &message.key);
    }
}

pub struct ScriptParamRenameHandler;

impl Handler<ScriptParamRename> for ScriptParamRenameHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &ScriptParamRename, _: &OnlineMessageRef, _: PeerId) {
        let target = target(ctx.online, message.param_id);
        if !ctx
            .scene
            .rename_script_param(target, &message.key, &message.new_key)
        {
            warn!(?target, key = %message.key, "rename skipped");
        }
    }
}
