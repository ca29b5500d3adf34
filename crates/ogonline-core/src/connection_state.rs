//! Admission state machine for a single incoming connection.
//!
//! The machine is pure: [`PendingConnection::update`] inspects the flags set
//! by incoming control packages and returns the side effects to perform.
//! States only move forward, one step at a time, or straight to `Closed`.

use ogonline_proto::constants::DEVELOPMENT_BUILD_ID;
use ogonline_proto::{ConnId, ConnectionClosedReason, PeerId};
use tracing::{debug, info};

use crate::utility::{INVALID_PLAYER_NAME, is_valid_player_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Build version requested, waiting for the answer.
    AwaitingVersion,
    /// Session parameters sent, waiting for the client's name and mods.
    AwaitingClientParameters,
    /// Comparing the client's active mods against ours.
    AwaitingModCompatibility,
    /// Level metadata and the persistent log are on their way.
    SendingPersistentQueue,
    /// Waiting for the client to finish loading and for our own level to run.
    AwaitingLoadCompletion,
    Active,
    Closed(ConnectionClosedReason),
}

impl ConnectionState {
    pub fn is_active(self) -> bool {
        self == ConnectionState::Active
    }

    pub fn is_closed(self) -> bool {
        matches!(self, ConnectionState::Closed(_))
    }

    /// Position in the admission order, `Closed` is last.
    pub fn rank(self) -> u8 {
        match self {
            ConnectionState::AwaitingVersion => 0,
            ConnectionState::AwaitingClientParameters => 1,
            ConnectionState::AwaitingModCompatibility => 2,
            ConnectionState::SendingPersistentQueue => 3,
            ConnectionState::AwaitingLoadCompletion => 4,
            ConnectionState::Active => 5,
            ConnectionState::Closed(_) => 6,
        }
    }
}

/// Control data a client hands to the host during admission.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPackage {
    BuildVersion(i32),
    ClientParameters {
        player_name: String,
        active_mods: String,
    },
    LoadingCompleted,
}

/// Side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeAction {
    SendBuildVersionRequest,
    SendSessionParameters,
    /// Send level metadata followed by the persistent log.
    SendLevelAndPersistentLog,
    /// Chat line shown only to the host.
    LocalChat(String),
    /// Chat line sent to everyone.
    BroadcastChat(String),
    Close(ConnectionClosedReason),
    /// The connection is admitted; create the player.
    Establish { player_name: String },
}

/// Host-side facts the machine needs.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeContext<'a> {
    pub host_build_id: i32,
    pub host_mods: &'a str,
    pub host_started_level: bool,
}

#[derive(Debug, Clone)]
pub struct PendingConnection {
    pub peer_id: PeerId,
    pub conn_id: ConnId,
    state: ConnectionState,
    entered: bool,

    pub received_version: bool,
    pub build_id: i32,
    pub received_client_params: bool,
    pub player_name: String,
    pub active_mods: String,
    pub finished_sending_persistent_queue: bool,
    pub finished_loading: bool,
}

impl PendingConnection {
    pub fn new(peer_id: PeerId, conn_id: ConnId) -> Self {
        Self {
            peer_id,
            conn_id,
            state: ConnectionState::AwaitingVersion,
            entered: false,
            received_version: false,
            build_id: 0,
            received_client_params: false,
            player_name: String::new(),
            active_mods: String::new(),
            finished_sending_persistent_queue: false,
            finished_loading: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Records a control package. Returns false if it is not expected in the
    /// current state.
    pub fn apply(&mut self, package: ControlPackage) -> bool {
        match (package, self.state) {
            (ControlPackage::BuildVersion(build_id), ConnectionState::AwaitingVersion) => {
                self.build_id = build_id;
                self.received_version = true;
                true
            }
            (
                ControlPackage::ClientParameters {
                    player_name,
                    active_mods,
                },
                ConnectionState::AwaitingClientParameters,
            ) => {
                self.player_name = player_name;
                self.active_mods = active_mods;
                self.received_client_params = true;
                true
            }
            (
                ControlPackage::LoadingCompleted,
                ConnectionState::SendingPersistentQueue | ConnectionState::AwaitingLoadCompletion,
            ) => {
                self.finished_loading = true;
                true
            }
            (package, state) => {
                debug!(peer_id = self.peer_id, ?package, ?state, "unexpected control package");
                false
            }
        }
    }

    /// Marks the persistent log as delivered.
    pub fn set_persistent_queue_sent(&mut self) {
        self.finished_sending_persistent_queue = true;
    }

    /// Moves to `Closed` from any state without side effects.
    pub fn close(&mut self, reason: ConnectionClosedReason) {
        if !self.state.is_closed() {
            self.set_state(ConnectionState::Closed(reason));
        }
    }

    /// Sends the connection back to level sync, e.g. after a level change.
    pub fn reset_to_sync(&mut self) {
        if self.state.rank() < ConnectionState::SendingPersistentQueue.rank() || self.state.is_closed() {
            return;
        }
        self.finished_sending_persistent_queue = false;
        self.finished_loading = false;
        self.state = ConnectionState::SendingPersistentQueue;
        self.entered = false;
    }

    /// Runs enter effects and transitions until the state settles.
    pub fn update(&mut self, ctx: &HandshakeContext<'_>) -> Vec<HandshakeAction> {
        let mut actions = Vec::new();
        loop {
            if !self.entered {
                self.entered = true;
                self.on_enter(&mut actions);
            }
            match self.next_state(ctx, &mut actions) {
                Some(next) => self.set_state(next),
                None => break,
            }
        }
        actions
    }

    fn set_state(&mut self, next: ConnectionState) {
        debug_assert!(
            next.is_closed() || next.rank() == self.state.rank() + 1,
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(peer_id = self.peer_id, from = ?self.state, to = ?next, "connection state");
        self.state = next;
        self.entered = false;
    }

    fn on_enter(&mut self, actions: &mut Vec<HandshakeAction>) {
        match self.state {
            ConnectionState::AwaitingVersion => actions.push(HandshakeAction::SendBuildVersionRequest),
            ConnectionState::AwaitingClientParameters => actions.push(HandshakeAction::SendSessionParameters),
            ConnectionState::SendingPersistentQueue => actions.push(HandshakeAction::SendLevelAndPersistentLog),
            ConnectionState::Active => {
                info!(peer_id = self.peer_id, player_name = %self.player_name, "connection established");
                actions.push(HandshakeAction::Establish {
                    player_name: self.player_name.clone(),
                });
            }
            ConnectionState::AwaitingModCompatibility
            | ConnectionState::AwaitingLoadCompletion
            | ConnectionState::Closed(_) => {}
        }
    }

    fn next_state(
        &mut self,
        ctx: &HandshakeContext<'_>,
        actions: &mut Vec<HandshakeAction>,
    ) -> Option<ConnectionState> {
        match self.state {
            ConnectionState::AwaitingVersion => {
                if !self.received_version {
                    return None;
                }
                if self.build_id == ctx.host_build_id {
                    return Some(ConnectionState::AwaitingClientParameters);
                }
                if self.build_id == DEVELOPMENT_BUILD_ID || ctx.host_build_id == DEVELOPMENT_BUILD_ID {
                    actions.push(HandshakeAction::BroadcastChat(
                        "[Warning] Client with another version connected, but was granted access since the host or client is running a development version".to_owned(),
                    ));
                    return Some(ConnectionState::AwaitingClientParameters);
                }
                let reason = if self.build_id < ctx.host_build_id {
                    ConnectionClosedReason::ClientOutdated
                } else {
                    ConnectionClosedReason::ServerOutdated
                };
                actions.push(HandshakeAction::Close(reason));
                Some(ConnectionState::Closed(reason))
            }
            ConnectionState::AwaitingClientParameters => {
                if !self.received_client_params {
                    return None;
                }
                if !is_valid_player_name(&self.player_name) {
                    self.player_name = INVALID_PLAYER_NAME.to_owned();
                }
                Some(ConnectionState::AwaitingModCompatibility)
            }
            ConnectionState::AwaitingModCompatibility => {
                if self.active_mods == ctx.host_mods {
                    return Some(ConnectionState::SendingPersistentQueue);
                }
                actions.push(HandshakeAction::LocalChat(format!(
                    "\"{}\" tried to connect, but was rejected entry due to a mod mismatch",
                    self.player_name
                )));
                actions.push(HandshakeAction::LocalChat(format!(
                    " - Expected mods: \"{}\"",
                    ctx.host_mods
                )));
                actions.push(HandshakeAction::LocalChat(format!(
                    " - Client's mods: \"{}\"",
                    self.active_mods
                )));
                let reason = ConnectionClosedReason::ModMismatch;
                actions.push(HandshakeAction::Close(reason));
                Some(ConnectionState::Closed(reason))
            }
            ConnectionState::SendingPersistentQueue => self
                .finished_sending_persistent_queue
                .then_some(ConnectionState::AwaitingLoadCompletion),
            ConnectionState::AwaitingLoadCompletion => {
                (self.finished_loading && ctx.host_started_level).then_some(ConnectionState::Active)
            }
            ConnectionState::Active | ConnectionState::Closed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST_BUILD: i32 = 500;

    fn ctx(mods: &str, started: bool) -> HandshakeContext<'_> {
        HandshakeContext {
            host_build_id: HOST_BUILD,
            host_mods: mods,
            host_started_level: started,
        }
    }

    fn params(name: &str, mods: &str) -> ControlPackage {
        ControlPackage::ClientParameters {
            player_name: name.to_owned(),
            active_mods: mods.to_owned(),
        }
    }

    #[test]
    fn happy_path_reaches_active() {
        let mut c = PendingConnection::new(1, 10);
        let ctx = ctx("", true);

        assert_eq!(c.update(&ctx), vec![HandshakeAction::SendBuildVersionRequest]);
        assert_eq!(c.state(), ConnectionState::AwaitingVersion);

        assert!(c.apply(ControlPackage::BuildVersion(HOST_BUILD)));
        assert_eq!(c.update(&ctx), vec![HandshakeAction::SendSessionParameters]);
        assert_eq!(c.state(), ConnectionState::AwaitingClientParameters);

        assert!(c.apply(params("Turner", "")));
        assert_eq!(c.update(&ctx), vec![HandshakeAction::SendLevelAndPersistentLog]);
        assert_eq!(c.state(), ConnectionState::SendingPersistentQueue);

        assert!(c.apply(ControlPackage::LoadingCompleted));
        assert!(c.update(&ctx).is_empty());
        assert_eq!(c.state(), ConnectionState::SendingPersistentQueue);

        c.set_persistent_queue_sent();
        assert_eq!(
            c.update(&ctx),
            vec![HandshakeAction::Establish {
                player_name: "Turner".to_owned()
            }]
        );
        assert_eq!(c.state(), ConnectionState::Active);
        assert!(c.update(&ctx).is_empty());
    }

    #[test]
    fn waits_for_host_level() {
        let mut c = PendingConnection::new(1, 10);
        c.update(&ctx("", false));
        c.apply(ControlPackage::BuildVersion(HOST_BUILD));
        c.apply(params("Turner", ""));
        c.update(&ctx("", false));
        c.set_persistent_queue_sent();
        c.apply(ControlPackage::LoadingCompleted);
        c.update(&ctx("", false));
        assert_eq!(c.state(), ConnectionState::AwaitingLoadCompletion);

        c.update(&ctx("", true));
        assert_eq!(c.state(), ConnectionState::Active);
    }

    /// Walks a fresh connection forward `steps` settled states.
    fn advanced(steps: usize, ctx: &HandshakeContext<'_>) -> PendingConnection {
        let mut c = PendingConnection::new(1, 10);
        c.update(ctx);
        let mut feed = [
            ControlPackage::BuildVersion(HOST_BUILD),
            params("Turner", ""),
            ControlPackage::LoadingCompleted,
        ]
        .into_iter();
        for step in 0..steps {
            if step == 2 {
                c.set_persistent_queue_sent();
            } else if let Some(package) = feed.next() {
                c.apply(package);
            }
            c.update(ctx);
        }
        c
    }

    #[test]
    fn close_ends_admission_from_any_waiting_state() {
        let waiting = ctx("", false);
        let expected = [
            ConnectionState::AwaitingVersion,
            ConnectionState::AwaitingClientParameters,
            ConnectionState::SendingPersistentQueue,
            ConnectionState::AwaitingLoadCompletion,
        ];
        for (steps, state) in expected.into_iter().enumerate() {
            let mut c = advanced(steps, &waiting);
            assert_eq!(c.state(), state);

            let reason = ConnectionClosedReason::Disconnected;
            c.close(reason);
            assert_eq!(c.state(), ConnectionState::Closed(reason));

            // Late packages and a finished level no longer move it.
            assert!(!c.apply(ControlPackage::LoadingCompleted));
            c.set_persistent_queue_sent();
            assert!(c.update(&ctx("", true)).is_empty());
            assert_eq!(c.state(), ConnectionState::Closed(reason));

            c.close(ConnectionClosedReason::Unspecified);
            assert_eq!(c.state(), ConnectionState::Closed(reason));
        }
    }

    #[test]
    fn older_client_is_outdated() {
        let mut c = PendingConnection::new(1, 10);
        c.update(&ctx("", true));
        c.apply(ControlPackage::BuildVersion(HOST_BUILD - 1));
        assert_eq!(
            c.update(&ctx("", true)),
            vec![HandshakeAction::Close(ConnectionClosedReason::ClientOutdated)]
        );
        assert_eq!(c.state(), ConnectionState::Closed(ConnectionClosedReason::ClientOutdated));
    }

    #[test]
    fn newer_client_means_server_outdated() {
        let mut c = PendingConnection::new(1, 10);
        c.update(&ctx("", true));
        c.apply(ControlPackage::BuildVersion(HOST_BUILD + 1));
        c.update(&ctx("", true));
        assert_eq!(c.state(), ConnectionState::Closed(ConnectionClosedReason::ServerOutdated));
    }

    #[test]
    fn development_build_is_admitted_with_warning() {
        let mut c = PendingConnection::new(1, 10);
        c.update(&ctx("", true));
        c.apply(ControlPackage::BuildVersion(DEVELOPMENT_BUILD_ID));
        let actions = c.update(&ctx("", true));
        assert!(matches!(actions[0], HandshakeAction::BroadcastChat(_)));
        assert_eq!(actions[1], HandshakeAction::SendSessionParameters);
        assert_eq!(c.state(), ConnectionState::AwaitingClientParameters);
    }

    #[test]
    fn mod_mismatch_posts_three_lines_then_closes() {
        let mut c = PendingConnection::new(1, 10);
        let ctx = ctx("alpha", true);
        c.update(&ctx);
        c.apply(ControlPackage::BuildVersion(HOST_BUILD));
        c.update(&ctx);
        c.apply(params("Turner", "beta"));
        let actions = c.update(&ctx);

        let chats = actions
            .iter()
            .filter(|a| matches!(a, HandshakeAction::LocalChat(_)))
            .count();
        assert_eq!(chats, 3);
        assert_eq!(
            actions.last(),
            Some(&HandshakeAction::Close(ConnectionClosedReason::ModMismatch))
        );
        assert_eq!(c.state(), ConnectionState::Closed(ConnectionClosedReason::ModMismatch));
    }

    #[test]
    fn invalid_name_is_replaced() {
        let mut c = PendingConnection::new(1, 10);
        let ctx = ctx("", true);
        c.update(&ctx);
        c.apply(ControlPackage::BuildVersion(HOST_BUILD));
        c.update(&ctx);
        c.apply(params("x!", ""));
        c.update(&ctx);
        assert_eq!(c.player_name, INVALID_PLAYER_NAME);
    }

    #[test]
    fn out_of_order_packages_are_rejected() {
        let mut c = PendingConnection::new(1, 10);
        c.update(&ctx("", true));
        assert!(!c.apply(params("Turner", "")));
        assert!(!c.apply(ControlPackage::LoadingCompleted));
        assert!(!c.received_client_params);
    }

    #[test]
    fn reset_returns_to_sync_and_resends_level() {
        let mut c = PendingConnection::new(1, 10);
        let ctx = ctx("", true);
        c.update(&ctx);
        c.apply(ControlPackage::BuildVersion(HOST_BUILD));
        c.update(&ctx);
        c.apply(params("Turner", ""));
        c.update(&ctx);
        c.set_persistent_queue_sent();
        c.apply(ControlPackage::LoadingCompleted);
        c.update(&ctx);
        assert!(c.state().is_active());

        c.reset_to_sync();
        assert!(!c.finished_loading);
        assert_eq!(c.update(&ctx), vec![HandshakeAction::SendLevelAndPersistentLog]);
        assert_eq!(c.state(), ConnectionState::SendingPersistentQueue);
    }
}
