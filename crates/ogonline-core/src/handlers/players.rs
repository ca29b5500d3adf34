use ogonline_proto::ids::{INVALID_OBJECT_ID, INVALID_PLAYER_ID, player_id_for_peer};
use ogonline_proto::messages::{ChatEntry, HostSessionFlag, Ping, Pong, RemovePlayerState, SetPlayerState};
use ogonline_proto::PeerId;
use tracing::{debug, warn};

use crate::chat::{is_command, parse_command};
use crate::message_ref::OnlineMessageRef;
use crate::registry::{ExecuteContext, Handler};

/// Client: mirrors a player's state, with the avatar id made local.
pub struct SetPlayerStateHandler;

impl Handler<SetPlayerState> for SetPlayerStateHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &SetPlayerState, _: &OnlineMessageRef, _: PeerId) {
        if ctx.online.is_hosting() {
            return;
        }
        if message.state.player_id == INVALID_PLAYER_ID {
            warn!(player_name = %message.state.player_name, "player state without a player id");
            return;
        }
        let mut state = message.state.clone();
        if state.object_id != INVALID_OBJECT_ID {
            state.object_id = ctx.online.object_id(state.object_id);
        }
        if let Some(session) = ctx.online.session() {
            session.player_states.lock().insert(state.player_id, state);
        }
    }
}

pub struct RemovePlayerStateHandler;

impl Handler<RemovePlayerState> for RemovePlayerStateHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &RemovePlayerState, _: &OnlineMessageRef, _: PeerId) {
        if ctx.online.is_hosting() {
            return;
        }
        if let Some(session) = ctx.online.session() {
            session.player_states.lock().remove(&message.player_id);
        }
    }
}

/// Host: relays a client's line under the sender's name, or queues it as a
/// command. Client: shows the line.
pub struct ChatEntryHandler;

impl Handler<ChatEntry> for ChatEntryHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &ChatEntry, _: &OnlineMessageRef, from: PeerId) {
        let online = &mut *ctx.online;
        if !online.is_hosting() {
            online.add_local_chat_message(message.text.clone());
            return;
        }

        let player_id = player_id_for_peer(from);
        let name = online
            .player_state(player_id)
            .map(|s| s.player_name)
            .unwrap_or_else(|| format!("Player {player_id}"));
        let line = format!("{name}: {}", message.text);
        if is_command(&message.text) {
            online.push_command(player_id, parse_command(&message.text));
            online.add_local_chat_message(line);
        } else {
            online.send_raw_chat_message(&line);
        }
    }
}

pub struct HostSessionFlagHandler;

impl Handler<HostSessionFlag> for HostSessionFlagHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &HostSessionFlag, _: &OnlineMessageRef, _: PeerId) {
        match ctx.online.session() {
            Some(session) if !session.is_host() => {
                session
                    .host_session_flags
                    .lock()
                    .insert(message.flag, message.value);
            }
            _ => {}
        }
    }
}

pub struct PingHandler;

impl Handler<Ping> for PingHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &Ping, _: &OnlineMessageRef, from: PeerId) {
        ctx.online.send_to_peer(from, Pong { id: message.id });
    }
}

pub struct PongHandler;

impl Handler<Pong> for PongHandler {
    fn execute(&self, ctx: &mut ExecuteContext<'_>, message: &Pong, _: &OnlineMessageRef, from: PeerId) {
        if ctx.online.is_hosting() {
            ctx.online.complete_ping(from, message.id);
        } else {
            debug!(id = message.id, "unexpected pong");
        }
    }
}
