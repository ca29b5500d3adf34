use ogonline_proto::constants::DEVELOPMENT_BUILD_ID;
use ogonline_proto::ids::INVALID_PLAYER_ID;
use ogonline_proto::messages::{
    AssignPlayerId, BuildVersion, BuildVersionRequest, ClientParameters, FileTransferMetadata, LoadingCompleted,
    SessionParameters,
};
use ogonline_proto::{ConnectionClosedReason, PeerId};
use tracing::{debug, info, warn};

use crate::connection_state::ControlPackage;
use crate::message_ref::OnlineMessageRef;
use crate::registry::{ExecuteContext, Handler};
use crate::session::BindingTable;
use crate::utility::active_mods_string;

/// Client: answers the host's version request with the local build id.
pub struct BuildVersionRequestHandler;

impl Handler<BuildVersionRequest> for BuildVersionRequestHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &BuildVersionRequest, _: &OnlineMessageRef, _: PeerId) {
        let online = &mut *ctx.online;
        if online.is_hosting() {
            return;
        }
        let build_id = online.config().build_id;
        if message.host_build_id != build_id
            && message.host_build_id != DEVELOPMENT_BUILD_ID
            && build_id != DEVELOPMENT_BUILD_ID
        {
            warn!(host = message.host_build_id, local = build_id, "build mismatch with host");
        }
        online.send(BuildVersion { build_id });
    }
}

pub struct BuildVersionHandler;

impl Handler<BuildVersion> for BuildVersionHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &BuildVersion, _: &OnlineMessageRef, from: PeerId) {
        if ctx.online.is_hosting() {
            ctx.online
                .apply_control_package(from, ControlPackage::BuildVersion(message.build_id));
        }
    }
}

/// Client: adopts the host's bindings and flags, then introduces itself.
pub struct SessionParametersHandler;

impl Handler<SessionParameters> for SessionParametersHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &SessionParameters, _: &OnlineMessageRef, _: PeerId) {
        let online = &mut *ctx.online;
        if online.is_hosting() {
            return;
        }
        if let Some(session) = online.session() {
            let mut bindings = BindingTable::default();
            for (name, id) in &message.bindings {
                bindings.insert(name.clone(), *id);
            }
            *session.bindings.lock() = bindings;
            let mut flags = session.host_session_flags.lock();
            flags.clear();
            flags.extend(message.host_session_flags.iter().copied());
        }
        online.send(ClientParameters {
            player_name: online.config().player_name.clone(),
            active_mods: active_mods_string(&online.config().mods),
        });
    }
}

pub struct ClientParametersHandler;

impl Handler<ClientParameters> for ClientParametersHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &ClientParameters, _: &OnlineMessageRef, from: PeerId) {
        if ctx.online.is_hosting() {
            ctx.online.apply_control_package(
                from,
                ControlPackage::ClientParameters {
                    player_name: message.player_name.clone(),
                    active_mods: message.active_mods.clone(),
                },
            );
        }
    }
}

/// Client: loads the host's level and reports back once it is ready.
pub struct FileTransferMetadataHandler;

impl Handler<FileTransferMetadata> for FileTransferMetadataHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &FileTransferMetadata, _: &OnlineMessageRef, from: PeerId) {
        if ctx.online.is_hosting() {
            return;
        }
        ctx.online
            .begin_client_level_load(&message.level_name, &message.campaign_id);
        if ctx
            .scene
            .load_level(&message.level_name, &message.campaign_id)
        {
            info!(level = %message.level_name, "level loaded");
            ctx.online.set_level_loaded(&mut *ctx.scene);
        } else {
            warn!(level = %message.level_name, "level missing locally");
            ctx.online
                .set_last_error(format!("Missing level: {}", message.level_name));
            ctx.online
                .close_peer(from, ConnectionClosedReason::MissingFiles);
        }
    }
}

/// Host: the client finished loading. Client: the host level is running.
pub struct LoadingCompletedHandler;

impl Handler<LoadingCompleted> for LoadingCompletedHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, _: &LoadingCompleted, _: &OnlineMessageRef, from: PeerId) {
        if ctx.online.is_hosting() {
            ctx.online
                .apply_control_package(from, ControlPackage::LoadingCompleted);
        } else {
            ctx.online.session_started(true);
        }
    }
}

pub struct AssignPlayerIdHandler;

impl Handler<AssignPlayerId> for AssignPlayerIdHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &AssignPlayerId, _: &OnlineMessageRef, _: PeerId) {
        match ctx.online.session() {
            Some(_) if message.player_id == INVALID_PLAYER_ID => {
                warn!("player id assignment without an id");
            }
            Some(session) if !session.is_host() => {
                debug!(player_id = message.player_id, "assigned player id");
                session.set_local_player_id(message.player_id);
            }
            _ => {}
        }
    }
}
