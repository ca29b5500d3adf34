//! Connected peers.

use ogonline_proto::ids::HOST_PEER_ID;
use ogonline_proto::{ConnId, ConnectionClosedReason, PeerId};

use crate::connection_manager::ClientConnectionManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub conn_id: ConnId,
    pub peer_id: PeerId,
}

/// Where the worker may send, and whether the persistent log already went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub conn_id: ConnId,
    pub peer_id: PeerId,
    pub has_persistent_queue: bool,
}

/// Peers plus their admission state, guarded together by one lock.
#[derive(Debug)]
pub struct PeerTable {
    peers: Vec<Peer>,
    next_peer_id: PeerId,
    pub connections: ClientConnectionManager,
}

impl Default for PeerTable {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            next_peer_id: HOST_PEER_ID + 1,
            connections: ClientConnectionManager::new(),
        }
    }
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client side: the single connection to the host.
    pub fn add_host(&mut self, conn_id: ConnId) -> Peer {
        let peer = Peer {
            conn_id,
            peer_id: HOST_PEER_ID,
        };
        self.peers.push(peer.clone());
        peer
    }

    /// Host side: a new client, which also enters admission.
    pub fn add_client(&mut self, conn_id: ConnId) -> Peer {
        let peer = Peer {
            conn_id,
            peer_id: self.next_peer_id,
        };
        self.next_peer_id += 1;
        self.connections.add_connection(peer.peer_id, conn_id);
        self.peers.push(peer.clone());
        peer
    }

    pub fn by_conn(&self, conn_id: ConnId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.conn_id == conn_id)
    }

    pub fn by_peer(&self, peer_id: PeerId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.peer_id == peer_id)
    }

    /// Forgets a peer and closes its admission state.
    pub fn remove_by_conn(&mut self, conn_id: ConnId, reason: ConnectionClosedReason) -> Option<Peer> {
        let idx = self.peers.iter().position(|p| p.conn_id == conn_id)?;
        let peer = self.peers.remove(idx);
        self.connections.remove_connection(peer.peer_id, reason);
        Some(peer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Snapshot used by the worker for one flush.
    ///
    /// On a client every route counts as having the log; only the host gates.
    pub fn routes(&self, hosting: bool) -> Vec<Route> {
        self.peers
            .iter()
            .map(|p| Route {
                conn_id: p.conn_id,
                peer_id: p.peer_id,
                has_persistent_queue: !hosting
                    || self.connections.has_client_gotten_persistent_queue(p.peer_id),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
        self.connections = ClientConnectionManager::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_peer_ids_increase() {
        let mut t = PeerTable::new();
        assert_eq!(t.add_client(5).peer_id, 1);
        assert_eq!(t.add_client(6).peer_id, 2);
        assert_eq!(t.connections.len(), 2);

        assert_eq!(t.remove_by_conn(5, ConnectionClosedReason::Disconnected).map(|p| p.peer_id), Some(1));
        assert_eq!(t.connections.len(), 1);
        // Ids are never reused.
        assert_eq!(t.add_client(7).peer_id, 3);
    }

    #[test]
    fn routes_gate_only_on_host() {
        let mut t = PeerTable::new();
        t.add_client(5);
        assert!(!t.routes(true)[0].has_persistent_queue);
        assert!(t.routes(false)[0].has_persistent_queue);
    }
}
