//! Host-side bookkeeping of every connection still going through admission
//! (and the ones already admitted, until they leave).

use ogonline_proto::{ConnId, ConnectionClosedReason, PeerId};
use tracing::{debug, warn};

use crate::connection_state::{
    ConnectionState, ControlPackage, HandshakeAction, HandshakeContext, PendingConnection,
};

#[derive(Debug, Default)]
pub struct ClientConnectionManager {
    connections: Vec<PendingConnection>,
}

impl ClientConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&mut self, peer_id: PeerId, conn_id: ConnId) {
        if self.get(peer_id).is_some() {
            warn!(peer_id, conn_id, "connection already tracked");
            return;
        }
        self.connections.push(PendingConnection::new(peer_id, conn_id));
    }

    /// Hands a control package to the peer's state machine. Returns false for
    /// unknown peers and for packages the current state does not expect.
    pub fn apply_package(&mut self, peer_id: PeerId, package: ControlPackage) -> bool {
        match self.get_mut(peer_id) {
            Some(c) => c.apply(package),
            None => {
                warn!(peer_id, "control package for unknown connection");
                false
            }
        }
    }

    pub fn set_persistent_queue_sent(&mut self, conn_id: ConnId) -> bool {
        match self.connections.iter_mut().find(|c| c.conn_id == conn_id) {
            Some(c) => {
                c.set_persistent_queue_sent();
                true
            }
            None => false,
        }
    }

    pub fn has_client_gotten_persistent_queue(&self, peer_id: PeerId) -> bool {
        self.get(peer_id)
            .is_some_and(|c| c.finished_sending_persistent_queue)
    }

    pub fn state(&self, peer_id: PeerId) -> Option<ConnectionState> {
        self.get(peer_id).map(PendingConnection::state)
    }

    pub fn get(&self, peer_id: PeerId) -> Option<&PendingConnection> {
        self.connections.iter().find(|c| c.peer_id == peer_id)
    }

    fn get_mut(&mut self, peer_id: PeerId) -> Option<&mut PendingConnection> {
        self.connections.iter_mut().find(|c| c.peer_id == peer_id)
    }

    /// True when every open connection has finished loading. Vacuously true
    /// with no connections; callers that need peers check the count.
    pub fn is_every_client_loaded(&self) -> bool {
        self.connections
            .iter()
            .filter(|c| !c.state().is_closed())
            .all(|c| c.finished_loading)
    }

    /// Stops tracking a peer. The returned state machine is already closed, so
    /// whatever step it was waiting on never completes.
    pub fn remove_connection(
        &mut self,
        peer_id: PeerId,
        reason: ConnectionClosedReason,
    ) -> Option<PendingConnection> {
        let idx = self.connections.iter().position(|c| c.peer_id == peer_id)?;
        let mut connection = self.connections.remove(idx);
        debug!(peer_id, state = ?connection.state(), %reason, "closing connection state");
        connection.close(reason);
        Some(connection)
    }

    /// Sends every admitted connection back to level sync.
    pub fn reset_connections(&mut self) {
        for c in &mut self.connections {
            c.reset_to_sync();
        }
    }

    /// Advances every state machine and collects their side effects.
    pub fn update(&mut self, ctx: &HandshakeContext<'_>) -> Vec<(PeerId, ConnId, HandshakeAction)> {
        let mut out = Vec::new();
        for c in &mut self.connections {
            let (peer_id, conn_id) = (c.peer_id, c.conn_id);
            out.extend(c.update(ctx).into_iter().map(|a| (peer_id, conn_id, a)));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HandshakeContext<'static> {
        HandshakeContext {
            host_build_id: 1,
            host_mods: "",
            host_started_level: true,
        }
    }

    #[test]
    fn no_connections_means_everyone_loaded() {
        assert!(ClientConnectionManager::new().is_every_client_loaded());
    }

    #[test]
    fn loading_tracked_per_connection() {
        let mut m = ClientConnectionManager::new();
        m.add_connection(1, 11);
        m.add_connection(2, 12);
        m.update(&ctx());
        for peer in [1, 2] {
            assert!(m.apply_package(peer, ControlPackage::BuildVersion(1)));
        }
        m.update(&ctx());
        for peer in [1, 2] {
            m.apply_package(
                peer,
                ControlPackage::ClientParameters {
                    player_name: format!("Player {peer}"),
                    active_mods: String::new(),
                },
            );
        }
        m.update(&ctx());
        assert!(!m.is_every_client_loaded());

        m.apply_package(1, ControlPackage::LoadingCompleted);
        assert!(!m.is_every_client_loaded());
        m.apply_package(2, ControlPackage::LoadingCompleted);
        assert!(m.is_every_client_loaded());

        let removed = m.remove_connection(2, ConnectionClosedReason::Disconnected);
        assert!(removed.is_some());
        assert!(m
            .remove_connection(2, ConnectionClosedReason::Disconnected)
            .is_none());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn removed_connection_is_closed_mid_handshake() {
        let mut m = ClientConnectionManager::new();
        m.add_connection(3, 30);
        m.update(&ctx());
        m.apply_package(3, ControlPackage::BuildVersion(1));
        m.update(&ctx());
        assert_eq!(m.state(3), Some(ConnectionState::AwaitingClientParameters));

        let mut removed = m
            .remove_connection(3, ConnectionClosedReason::Unspecified)
            .unwrap();
        assert_eq!(
            removed.state(),
            ConnectionState::Closed(ConnectionClosedReason::Unspecified)
        );
        assert!(removed.update(&ctx()).is_empty());
        assert_eq!(m.state(3), None);
    }

    #[test]
    fn update_tags_actions_with_peer() {
        let mut m = ClientConnectionManager::new();
        m.add_connection(7, 70);
        m.add_connection(7, 71);
        assert_eq!(m.len(), 1);
        assert_eq!(
            m.update(&ctx()),
            vec![(7, 70, HandshakeAction::SendBuildVersionRequest)]
        );
        assert!(!m.apply_package(99, ControlPackage::LoadingCompleted));
    }
}
