//! The main-thread facade over one multiplayer session.
//!
//! [`Online`] owns the session while it is active, queues outgoing messages,
//! executes received ones against a [`SceneGraph`] and drives connection
//! admission on the host.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use ogonline_proto::ids::{HOST_PLAYER_ID, INVALID_OBJECT_ID, player_id_for_peer};
use ogonline_proto::messages::{
    AssignPlayerId, AttachTo, BuildVersionRequest, CameraTransform, ChatEntry, CreateEntity, CutLine,
    EntityKind, FileTransferMetadata, HostSessionFlag, LoadingCompleted, OnlineFlag, Ping,
    PlayerInput, PlayerState, RemoveObject, RemovePlayerState, SessionParameters, SetPlayerState,
};
use ogonline_proto::{ConnId, ConnectionClosedReason, MessageType, ObjectId, OnlineMessage, PeerId, PlayerId};
use tracing::{debug, info, warn};

use crate::chat::{is_command, parse_command};
use crate::config::OnlineConfig;
use crate::connection_state::{ConnectionState, ControlPackage, HandshakeAction, HandshakeContext};
use crate::error::OnlineError;
use crate::handlers::default_registry;
use crate::id_translation::IdTranslation;
use crate::message_ref::OnlineMessageRef;
use crate::queues::{Outgoing, Target};
use crate::registry::{ExecuteContext, HandlerRegistry};
use crate::scene::{KeyState, SceneGraph};
use crate::session::{OnlineSession, Role, SessionEvent};
use crate::transport::Transport;
use crate::utility::active_mods_string;
use crate::worker::{NetworkThread, NetworkWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplayerMode {
    None,
    Host,
    Client,
}

enum NetworkDriver {
    Threaded(NetworkThread),
    Manual(NetworkWorker),
}

/// Level the session is playing.
#[derive(Debug, Default, Clone)]
struct LevelState {
    level_name: String,
    campaign_id: String,
    host_started_level: bool,
    loading: bool,
}

pub struct Online {
    config: OnlineConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<HandlerRegistry>,
    mode: MultiplayerMode,
    session: Option<Arc<OnlineSession>>,
    driver: Option<NetworkDriver>,
    ids: IdTranslation,
    level: LevelState,
    last_ping: Option<Instant>,
    next_ping_id: u32,
    pending_pings: HashMap<u32, (PeerId, Instant)>,
    /// Host flag values each peer was last told about.
    synced_flags: HashMap<PeerId, BTreeMap<u8, bool>>,
    commands: Vec<(PlayerId, Vec<String>)>,
    last_close_reason: Option<ConnectionClosedReason>,
    last_error: Option<String>,
}

impl Online {
    pub fn new(config: OnlineConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_registry(config, transport, default_registry())
    }

    pub fn with_registry(config: OnlineConfig, transport: Arc<dyn Transport>, registry: HandlerRegistry) -> Self {
        Self {
            config,
            transport,
            registry: Arc::new(registry),
            mode: MultiplayerMode::None,
            session: None,
            driver: None,
            ids: IdTranslation::new(),
            level: LevelState::default(),
            last_ping: None,
            next_ping_id: 0,
            pending_pings: HashMap::new(),
            synced_flags: HashMap::new(),
            commands: Vec::new(),
            last_close_reason: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &OnlineConfig {
        &self.config
    }

    pub fn mode(&self) -> MultiplayerMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_hosting(&self) -> bool {
        self.mode == MultiplayerMode::Host
    }

    pub fn is_client(&self) -> bool {
        self.mode == MultiplayerMode::Client
    }

    pub(crate) fn session(&self) -> Option<&Arc<OnlineSession>> {
        self.session.as_ref()
    }

    // ---- lifecycle ----

    /// Starts hosting `level_name`. The host's own player exists right away;
    /// call [`Online::set_level_loaded`] and [`Online::session_started`] once
    /// the level runs.
    pub fn start_hosting(&mut self, address: &str, level_name: &str, campaign_id: &str) -> Result<(), OnlineError> {
        if self.is_active() {
            return Err(OnlineError::AlreadyActive);
        }
        self.transport.listen(address)?;

        let session = Arc::new(OnlineSession::new(Role::Host, &self.config));
        session.player_states.lock().insert(
            HOST_PLAYER_ID,
            PlayerState {
                player_id: HOST_PLAYER_ID,
                player_name: self.config.player_name.clone(),
                ..PlayerState::default()
            },
        );
        session
            .host_session_flags
            .lock()
            .insert(OnlineFlag::AllowsEditor as u8, self.config.allows_editor);

        self.level = LevelState {
            level_name: level_name.to_owned(),
            campaign_id: campaign_id.to_owned(),
            host_started_level: false,
            loading: true,
        };
        self.begin(MultiplayerMode::Host, session)?;
        info!(address, level_name, "hosting");
        Ok(())
    }

    /// Connects to a host. Admission continues through [`Online::update`].
    pub fn connect(&mut self, address: &str) -> Result<(), OnlineError> {
        if self.is_active() {
            return Err(OnlineError::AlreadyActive);
        }
        let conn_id = self.transport.connect(address)?;
        let session = Arc::new(OnlineSession::new(Role::Client, &self.config));
        self.level = LevelState::default();
        self.begin(MultiplayerMode::Client, session)?;
        info!(address, conn_id, "connecting");
        Ok(())
    }

    fn begin(&mut self, mode: MultiplayerMode, session: Arc<OnlineSession>) -> Result<(), OnlineError> {
        let worker = NetworkWorker::new(session.clone(), self.transport.clone());
        let driver = if self.config.threaded_network {
            NetworkDriver::Threaded(NetworkThread::spawn(worker, self.config.tick_period).map_err(OnlineError::Thread)?)
        } else {
            NetworkDriver::Manual(worker)
        };
        self.ids.clear();
        self.pending_pings.clear();
        self.last_ping = None;
        self.last_close_reason = None;
        self.last_error = None;
        self.session = Some(session);
        self.driver = Some(driver);
        self.mode = mode;
        Ok(())
    }

    /// Closes every connection and ends the session.
    pub fn stop_multiplayer(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let reason = if session.is_host() {
            ConnectionClosedReason::HostStoppedHosting
        } else {
            ConnectionClosedReason::Disconnected
        };
        let conns = session
            .peers
            .lock()
            .iter()
            .map(|p| p.conn_id)
            .collect::<Vec<_>>();
        for conn_id in conns {
            session.request_close(conn_id, reason);
        }
        match self.driver.take() {
            Some(NetworkDriver::Threaded(thread)) => thread.stop(),
            Some(NetworkDriver::Manual(worker)) => worker.step(),
            None => {}
        }
        if session.is_host() {
            self.transport.stop_listening();
        }
        self.mode = MultiplayerMode::None;
        self.ids.clear();
        self.synced_flags.clear();
        info!("multiplayer stopped");
    }

    /// Runs one network step when the worker is not on its own thread.
    pub fn pump_network(&self) {
        if let Some(NetworkDriver::Manual(worker)) = &self.driver {
            worker.step();
        }
    }

    // ---- sending ----

    fn enqueue(&self, target: Target, message: OnlineMessageRef) {
        match &self.session {
            Some(session) => session.outgoing.push(Outgoing::Message { target, message }),
            None => debug!(message_type = ?message.message_type(), "not active, message dropped"),
        }
    }

    /// Broadcasts to every peer, subject to the persistent-log gate.
    pub fn send(&self, message: impl Into<OnlineMessage>) {
        self.enqueue(Target::Broadcast, OnlineMessageRef::new(message));
    }

    pub fn send_to(&self, conn_id: ConnId, message: impl Into<OnlineMessage>) {
        self.enqueue(Target::Connection(conn_id), OnlineMessageRef::new(message));
    }

    /// Broadcasts an existing envelope without copying the message.
    pub fn send_ref(&self, message: OnlineMessageRef) {
        self.enqueue(Target::Broadcast, message);
    }

    /// Sends to the peer with `peer_id`, if it is still connected.
    pub fn send_to_peer(&self, peer_id: PeerId, message: impl Into<OnlineMessage>) {
        match self.peer_conn(peer_id) {
            Some(conn_id) => self.send_to(conn_id, message),
            None => debug!(peer_id, "peer gone, message dropped"),
        }
    }

    pub fn peer_conn(&self, peer_id: PeerId) -> Option<ConnId> {
        let session = self.session.as_ref()?;
        let peers = session.peers.lock();
        peers.by_peer(peer_id).map(|p| p.conn_id)
    }

    /// Sends an attach/detach using local ids, translated for the wire.
    pub fn send_attach_to(&self, parent: ObjectId, child: ObjectId, bone_id: u32, attach: bool, mirrored: bool) {
        self.send(AttachTo {
            parent_id: self.original_id(parent),
            child_id: self.original_id(child),
            bone_id,
            attach,
            mirrored,
        });
    }

    /// Sends a cut on a local object, translated for the wire.
    pub fn send_cut_line(&self, mut cut: CutLine) {
        cut.object_id = self.original_id(cut.object_id);
        self.send(cut);
    }

    /// Mirrors the removal of a local object to peers.
    pub fn send_remove_object(&self, scene: &dyn SceneGraph, object_id: ObjectId) {
        if self.level.loading {
            return;
        }
        let Some(kind) = scene.object_kind(object_id) else {
            return;
        };
        if kind.is_network_removable() {
            self.send(RemoveObject {
                object_id: self.original_id(object_id),
                kind,
            });
        }
    }

    pub fn send_camera_transform(&self, transform: CameraTransform) {
        if self.is_client() {
            self.send(transform);
        }
    }

    /// Client: forwards a binding's state to the host.
    pub fn send_player_input(&self, binding: &str, state: KeyState) {
        let Some(session) = self.session.as_ref().filter(|_| self.is_client()) else {
            return;
        };
        let binding_id = session.bindings.lock().id(binding);
        match binding_id {
            Some(binding_id) => self.send(PlayerInput {
                binding_id,
                depth: state.depth,
                depth_count: state.depth_count,
                count: state.count,
            }),
            None => debug!(binding, "binding unknown to host"),
        }
    }

    /// Asks the network worker to close a connection.
    pub fn close_connection(&self, conn_id: ConnId, reason: ConnectionClosedReason) {
        if let Some(session) = &self.session {
            session.request_close(conn_id, reason);
        }
    }

    pub(crate) fn close_peer(&self, peer_id: PeerId, reason: ConnectionClosedReason) {
        if let Some(conn_id) = self.peer_conn(peer_id) {
            self.close_connection(conn_id, reason);
        }
    }

    // ---- id translation ----

    pub fn object_id(&self, original: ObjectId) -> ObjectId {
        self.ids.object_id(original)
    }

    pub fn original_id(&self, local: ObjectId) -> ObjectId {
        self.ids.original_id(local)
    }

    pub fn register_object_id(&mut self, original: ObjectId, local: ObjectId) {
        self.ids.register(original, local);
    }

    pub fn deregister_object_id(&mut self, local: ObjectId) -> Option<ObjectId> {
        self.ids.deregister_local(local)
    }

    // ---- main thread update ----

    /// Reacts to network events and executes every received message.
    pub fn check_pending_messages(&mut self, scene: &mut dyn SceneGraph) {
        let Some(session) = self.session.clone() else {
            return;
        };

        let mut host_lost = None;
        for event in session.events.drain() {
            match event {
                SessionEvent::PeerConnected { peer_id, conn_id } => {
                    debug!(peer_id, conn_id, "peer connected");
                    if !session.is_host() {
                        self.add_local_chat_message("Connected to host");
                    }
                }
                SessionEvent::PeerDisconnected { peer_id, reason, .. } => {
                    if session.is_host() {
                        self.pending_pings.retain(|_, (p, _)| *p != peer_id);
                        self.cleanup_player(scene, peer_id);
                    } else {
                        host_lost = Some(reason);
                    }
                }
            }
        }

        let registry = self.registry.clone();
        for incoming in session.incoming.drain() {
            let message_type = incoming.message.message_type();
            if session.is_host() && !self.admit_from_client(incoming.from, message_type) {
                continue;
            }
            let mut ctx = ExecuteContext {
                online: &mut *self,
                scene: &mut *scene,
            };
            if !registry.execute(&mut ctx, &incoming.message, incoming.from) {
                debug!(?message_type, "no handler registered");
            }
        }

        if let Some(reason) = host_lost {
            self.on_host_lost(reason);
        }
    }

    fn admit_from_client(&self, peer_id: PeerId, message_type: MessageType) -> bool {
        if message_type.is_host_only() {
            warn!(peer_id, ?message_type, "client sent a host-only message");
            self.close_peer(peer_id, ConnectionClosedReason::BadRequest);
            return false;
        }
        if !message_type.is_handshake_reply() && !self.is_peer_active(peer_id) {
            debug!(peer_id, ?message_type, "ignoring message from peer that is not admitted yet");
            return false;
        }
        true
    }

    fn on_host_lost(&mut self, reason: ConnectionClosedReason) {
        info!(%reason, "connection to host ended");
        self.last_close_reason = Some(reason);
        if reason.is_unusual() {
            self.last_error = Some(reason.error_message().to_owned());
        }
        self.stop_multiplayer();
    }

    /// Runs admission, pings and chat upkeep. Call once per frame after
    /// [`Online::check_pending_messages`].
    pub fn late_update(&mut self, scene: &mut dyn SceneGraph, now: Instant) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if session.is_host() {
            self.update_connections(scene, &session);
            self.sync_host_flags(&session);
            self.ping_peers(&session, now);
        }
        session.chat.lock().prune(now);
    }

    /// [`Online::check_pending_messages`] followed by [`Online::late_update`].
    pub fn update(&mut self, scene: &mut dyn SceneGraph, now: Instant) {
        self.check_pending_messages(scene);
        self.late_update(scene, now);
    }

    fn update_connections(&mut self, scene: &mut dyn SceneGraph, session: &OnlineSession) {
        let host_mods = active_mods_string(&self.config.mods);
        let ctx = HandshakeContext {
            host_build_id: self.config.build_id,
            host_mods: &host_mods,
            host_started_level: self.level.host_started_level,
        };
        let actions = session.peers.lock().connections.update(&ctx);
        for (peer_id, conn_id, action) in actions {
            self.apply_handshake_action(scene, session, peer_id, conn_id, action);
        }
    }

    fn apply_handshake_action(
        &mut self,
        scene: &mut dyn SceneGraph,
        session: &OnlineSession,
        peer_id: PeerId,
        conn_id: ConnId,
        action: HandshakeAction,
    ) {
        match action {
            HandshakeAction::SendBuildVersionRequest => self.send_to(
                conn_id,
                BuildVersionRequest {
                    host_build_id: self.config.build_id,
                },
            ),
            HandshakeAction::SendSessionParameters => {
                let bindings = session.bindings.lock().pairs();
                let flags = session.host_session_flags.lock().clone();
                let host_session_flags = flags.iter().map(|(f, v)| (*f, *v)).collect();
                self.synced_flags.insert(peer_id, flags);
                self.send_to(
                    conn_id,
                    SessionParameters {
                        bindings,
                        host_session_flags,
                    },
                );
            }
            HandshakeAction::SendLevelAndPersistentLog => {
                self.send_to(
                    conn_id,
                    FileTransferMetadata {
                        level_name: self.level.level_name.clone(),
                        campaign_id: self.level.campaign_id.clone(),
                    },
                );
                session
                    .outgoing
                    .push(Outgoing::ReplayPersistentLog { conn_id });
            }
            HandshakeAction::LocalChat(text) => self.add_local_chat_message(text),
            HandshakeAction::BroadcastChat(text) => self.send_raw_chat_message(&text),
            HandshakeAction::Close(reason) => {
                info!(peer_id, %reason, "admission refused");
                self.close_connection(conn_id, reason);
            }
            HandshakeAction::Establish { player_name } => {
                self.establish_player(scene, session, peer_id, conn_id, player_name);
            }
        }
    }

    fn establish_player(
        &mut self,
        scene: &mut dyn SceneGraph,
        session: &OnlineSession,
        peer_id: PeerId,
        conn_id: ConnId,
        player_name: String,
    ) {
        let player_id = player_id_for_peer(peer_id);
        self.send_to(conn_id, AssignPlayerId { player_id });

        let state = PlayerState {
            player_id,
            player_name: player_name.clone(),
            object_id: INVALID_OBJECT_ID,
            controller_id: scene.allocate_controller(),
            camera_id: scene.create_camera(),
            ping: 0,
        };
        session
            .player_states
            .lock()
            .insert(player_id, state.clone());
        self.send(SetPlayerState { state });
        self.send(LoadingCompleted);

        let free = session.avatars.lock().take();
        let avatar = free.or_else(|| self.create_character(scene, session));
        match avatar {
            Some(object_id) => self.possess_avatar(scene, session, player_id, object_id),
            None => warn!(player_id, "no avatar available for joining player"),
        }

        self.send_raw_chat_message(&format!("{player_name} just joined!"));

        let states = session
            .player_states
            .lock()
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for state in states {
            self.send_to(conn_id, SetPlayerState { state });
        }
    }

    fn create_character(&self, scene: &mut dyn SceneGraph, session: &OnlineSession) -> Option<ObjectId> {
        let host_avatar = session
            .player_states
            .lock()
            .get(&HOST_PLAYER_ID)
            .map(|s| s.object_id);
        let position = host_avatar
            .and_then(|id| scene.object_position(id))
            .unwrap_or_else(|| {
                warn!("no locally controlled character, spawning at origin");
                Default::default()
            });
        let path = self.config.hot_join_character.clone();
        let object_id = scene.create_entity(&path, position)?;
        session.avatars.lock().mark_taken(object_id);
        self.send(CreateEntity {
            path,
            position,
            object_id,
        });
        Some(object_id)
    }

    fn possess_avatar(&self, scene: &mut dyn SceneGraph, session: &OnlineSession, player_id: PlayerId, object_id: ObjectId) {
        let state = {
            let mut states = session.player_states.lock();
            let Some(state) = states.get_mut(&player_id) else {
                return;
            };
            state.object_id = object_id;
            state.clone()
        };
        scene.set_remote_controlled(object_id, Some(state.controller_id));
        self.send(SetPlayerState { state });
    }

    /// Host: releases everything a departed peer held.
    fn cleanup_player(&mut self, scene: &mut dyn SceneGraph, peer_id: PeerId) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let player_id = player_id_for_peer(peer_id);
        let removed = session.player_states.lock().remove(&player_id);
        let Some(state) = removed else {
            debug!(peer_id, "peer left before becoming a player");
            return;
        };

        if state.object_id != INVALID_OBJECT_ID {
            scene.set_remote_controlled(state.object_id, None);
            if scene.created_on_the_fly(state.object_id) {
                session.avatars.lock().forget(state.object_id);
                scene.remove_object(state.object_id);
                self.send(RemoveObject {
                    object_id: state.object_id,
                    kind: EntityKind::MovementObject,
                });
            } else {
                session.avatars.lock().release(state.object_id);
            }
        }

        self.send(RemovePlayerState { player_id });
        self.send_raw_chat_message(&format!("{} disconnected!", state.player_name));
        info!(peer_id, player_name = %state.player_name, "player removed");
    }

    fn ping_peers(&mut self, session: &OnlineSession, now: Instant) {
        if self
            .last_ping
            .is_some_and(|last| now.saturating_duration_since(last) < self.config.ping_interval)
        {
            return;
        }
        self.last_ping = Some(now);
        let peers = session
            .peers
            .lock()
            .iter()
            .map(|p| (p.peer_id, p.conn_id))
            .collect::<Vec<_>>();
        for (peer_id, conn_id) in peers {
            if !self.is_peer_active(peer_id) {
                continue;
            }
            self.next_ping_id = self.next_ping_id.wrapping_add(1);
            self.pending_pings.insert(self.next_ping_id, (peer_id, now));
            self.send_to(conn_id, Ping { id: self.next_ping_id });
        }
    }

    pub(crate) fn complete_ping(&mut self, from: PeerId, id: u32) {
        let Some((peer_id, sent)) = self.pending_pings.remove(&id) else {
            debug!(from, id, "pong for unknown ping");
            return;
        };
        if peer_id != from {
            debug!(from, id, "pong from the wrong peer");
            return;
        }
        let rtt = u32::try_from(sent.elapsed().as_millis()).unwrap_or(u32::MAX);
        if let Some(session) = &self.session {
            if let Some(state) = session
                .player_states
                .lock()
                .get_mut(&player_id_for_peer(peer_id))
            {
                state.ping = rtt;
            }
        }
    }

    // ---- host control ----

    pub(crate) fn apply_control_package(&self, peer_id: PeerId, package: ControlPackage) {
        if let Some(session) = &self.session {
            session
                .peers
                .lock()
                .connections
                .apply_package(peer_id, package);
        }
    }

    pub fn peer_state(&self, peer_id: PeerId) -> Option<ConnectionState> {
        let session = self.session.as_ref()?;
        let peers = session.peers.lock();
        peers.connections.state(peer_id)
    }

    pub fn is_peer_active(&self, peer_id: PeerId) -> bool {
        self.peer_state(peer_id).is_some_and(ConnectionState::is_active)
    }

    pub fn peer_count(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |s| s.peers.lock().len())
    }

    pub fn is_every_client_loaded(&self) -> bool {
        self.session
            .as_ref()
            .is_none_or(|s| s.peers.lock().connections.is_every_client_loaded())
    }

    pub fn persistent_log_len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.persistent.len())
    }

    // ---- level ----

    pub fn level_name(&self) -> &str {
        &self.level.level_name
    }

    pub fn campaign_id(&self) -> &str {
        &self.level.campaign_id
    }

    pub fn is_loading(&self) -> bool {
        self.level.loading
    }

    pub fn host_started_level(&self) -> bool {
        self.level.host_started_level
    }

    pub fn session_started(&mut self, host_started_level: bool) {
        self.level.host_started_level = host_started_level;
    }

    /// Host: switches every peer to a new level. Level-persistent history is
    /// discarded and all peers go back through level sync.
    pub fn change_level(&mut self, level_name: &str, campaign_id: &str) -> Result<(), OnlineError> {
        let session = self.session.clone().ok_or(OnlineError::NotActive)?;
        if !session.is_host() {
            return Err(OnlineError::NotHost);
        }
        self.level = LevelState {
            level_name: level_name.to_owned(),
            campaign_id: campaign_id.to_owned(),
            host_started_level: false,
            loading: true,
        };
        session.avatars.lock().clear();
        session.persistent.clear();
        session.peers.lock().connections.reset_connections();
        for state in session.player_states.lock().values_mut() {
            state.object_id = INVALID_OBJECT_ID;
        }
        info!(level_name, "level changed");
        Ok(())
    }

    /// Called once the local level finished loading.
    pub fn set_level_loaded(&mut self, scene: &mut dyn SceneGraph) {
        let Some(session) = self.session.clone() else {
            return;
        };
        self.level.loading = false;
        if session.is_host() {
            let own = {
                let mut avatars = session.avatars.lock();
                avatars.clear();
                for id in scene.avatar_ids() {
                    avatars.add_free(id);
                }
                avatars.take()
            };
            if let (Some(own), Some(state)) = (own, session.player_states.lock().get_mut(&HOST_PLAYER_ID)) {
                state.object_id = own;
            }
        } else {
            self.send(LoadingCompleted);
        }
    }

    pub(crate) fn begin_client_level_load(&mut self, level_name: &str, campaign_id: &str) {
        self.level = LevelState {
            level_name: level_name.to_owned(),
            campaign_id: campaign_id.to_owned(),
            host_started_level: false,
            loading: true,
        };
        self.ids.clear();
    }

    pub(crate) fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn last_close_reason(&self) -> Option<ConnectionClosedReason> {
        self.last_close_reason
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ---- players ----

    pub fn local_player_id(&self) -> PlayerId {
        self.session
            .as_ref()
            .map_or(HOST_PLAYER_ID, |s| s.local_player_id())
    }

    pub fn player_states(&self) -> BTreeMap<PlayerId, PlayerState> {
        self.session
            .as_ref()
            .map(|s| s.player_states.lock().clone())
            .unwrap_or_default()
    }

    pub fn player_state(&self, player_id: PlayerId) -> Option<PlayerState> {
        self.session
            .as_ref()?
            .player_states
            .lock()
            .get(&player_id)
            .cloned()
    }

    pub fn player_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.player_count())
    }

    // ---- chat ----

    /// Chat typed by the local player. The host prefixes its own name; a
    /// client's name is added by the host on relay.
    pub fn broadcast_chat_message(&mut self, text: &str) {
        if !self.is_active() {
            return;
        }
        if self.is_hosting() {
            let line = format!("{}: {text}", self.config.player_name);
            if is_command(text) {
                self.commands.push((HOST_PLAYER_ID, parse_command(text)));
                self.add_local_chat_message(line);
            } else {
                self.send_raw_chat_message(&line);
            }
        } else {
            self.send_raw_chat_message(text);
        }
    }

    /// Sends a chat line as-is. The host also shows it locally.
    pub fn send_raw_chat_message(&self, text: &str) {
        if !self.is_active() {
            return;
        }
        self.send(ChatEntry {
            text: text.to_owned(),
        });
        if self.is_hosting() {
            self.add_local_chat_message(text);
        }
    }

    pub fn add_local_chat_message(&self, text: impl Into<String>) {
        if let Some(session) = &self.session {
            session.add_local_chat(text);
        }
    }

    pub fn chat_lines(&self) -> Vec<String> {
        self.session
            .as_ref()
            .map(|s| s.chat.lock().texts())
            .unwrap_or_default()
    }

    pub(crate) fn push_command(&mut self, player_id: PlayerId, command: Vec<String>) {
        self.commands.push((player_id, command));
    }

    /// Chat commands received since the last call, with who issued them.
    pub fn take_commands(&mut self) -> Vec<(PlayerId, Vec<String>)> {
        std::mem::take(&mut self.commands)
    }

    // ---- session flags ----

    /// Host: changes a flag. Active peers learn about it on the next
    /// [`Online::late_update`].
    pub fn set_host_session_flag(&self, flag: OnlineFlag, value: bool) {
        if let Some(session) = self.session.as_ref().filter(|_| self.is_hosting()) {
            session.host_session_flags.lock().insert(flag as u8, value);
        }
    }

    /// Sends each active peer the flags whose value it has not seen yet.
    fn sync_host_flags(&mut self, session: &OnlineSession) {
        let flags = session.host_session_flags.lock().clone();
        let peers = session
            .peers
            .lock()
            .iter()
            .map(|p| (p.peer_id, p.conn_id))
            .collect::<Vec<_>>();
        // Peers briefly back in level sync keep what they were already told.
        self.synced_flags
            .retain(|peer_id, _| peers.iter().any(|(p, _)| p == peer_id));
        let active = peers
            .into_iter()
            .filter(|(peer_id, _)| self.is_peer_active(*peer_id))
            .collect::<Vec<_>>();

        for (peer_id, conn_id) in active {
            let known = self.synced_flags.entry(peer_id).or_default();
            let stale = flags
                .iter()
                .filter(|(f, v)| known.get(*f) != Some(*v))
                .map(|(f, v)| (*f, *v))
                .collect::<Vec<_>>();
            known.extend(stale.iter().copied());
            for (flag, value) in stale {
                self.send_to(conn_id, HostSessionFlag { flag, value });
            }
        }
    }

    pub fn host_session_flag(&self, flag: OnlineFlag) -> bool {
        self.session.as_ref().is_some_and(|s| {
            s.host_session_flags
                .lock()
                .get(&(flag as u8))
                .copied()
                .unwrap_or(false)
        })
    }
}

impl Drop for Online {
    fn drop(&mut self) {
        self.stop_multiplayer();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ogonline_proto::math::Vec3;

    use super::*;
    use crate::scene::memory::MemoryScene;
    use crate::transport::memory::MemoryNetwork;

    fn config(name: &str) -> OnlineConfig {
        OnlineConfig {
            player_name: name.to_owned(),
            threaded_network: false,
            ping_interval: Duration::ZERO,
            ..OnlineConfig::default()
        }
    }

    fn tick(online: &mut Online, scene: &mut MemoryScene) {
        online.pump_network();
        online.update(scene, Instant::now());
    }

    #[test]
    fn departed_peer_leaves_no_pending_pings() {
        let net = MemoryNetwork::new();
        let mut host = Online::new(config("Turner"), Arc::new(net.endpoint()));
        let mut host_scene = MemoryScene::new();
        host_scene.spawn_avatar(Vec3::new(0.0, 0.0, 0.0));
        host_scene.spawn_avatar(Vec3::new(1.0, 0.0, 0.0));
        host.start_hosting("memory:pings", "Data/Levels/arena.xml", "").unwrap();
        host.set_level_loaded(&mut host_scene);
        host.session_started(true);

        let mut client = Online::new(config("Amber"), Arc::new(net.endpoint()));
        let mut client_scene = MemoryScene::new();
        client_scene.spawn_avatar(Vec3::new(0.0, 0.0, 0.0));
        client_scene.spawn_avatar(Vec3::new(1.0, 0.0, 0.0));
        client.connect("memory:pings").unwrap();
        for _ in 0..40 {
            tick(&mut host, &mut host_scene);
            tick(&mut client, &mut client_scene);
        }
        assert!(host.is_peer_active(1));
        // The last round's ping has not been answered yet.
        assert!(!host.pending_pings.is_empty());

        net.sever(host.peer_conn(1).unwrap());
        for _ in 0..4 {
            tick(&mut host, &mut host_scene);
        }
        assert_eq!(host.peer_count(), 0);
        assert!(host.pending_pings.is_empty());
    }
}
