//! In-process transport. Every endpoint created from the same
//! [`MemoryNetwork`] can reach every listener registered on it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use ogonline_proto::{ConnId, ConnectionClosedReason, Delivery};
use parking_lot::Mutex;
use tracing::debug;

use super::{ConnectionChange, ConnectionEvent, Transport};
use crate::error::TransportError;

type EndpointId = u32;

#[derive(Debug)]
struct Link {
    owner: EndpointId,
    remote: ConnId,
    accepted: bool,
    inbox: VecDeque<Bytes>,
}

#[derive(Debug, Default)]
struct NetworkState {
    next_conn: ConnId,
    next_endpoint: EndpointId,
    listeners: HashMap<String, EndpointId>,
    links: HashMap<ConnId, Link>,
    events: HashMap<EndpointId, VecDeque<ConnectionEvent>>,
    drop_unreliable: bool,
}

impl NetworkState {
    fn push_event(&mut self, endpoint: EndpointId, conn_id: ConnId, change: ConnectionChange) {
        self.events
            .entry(endpoint)
            .or_default()
            .push_back(ConnectionEvent { conn_id, change });
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self) -> MemoryTransport {
        let mut state = self.state.lock();
        state.next_endpoint += 1;
        MemoryTransport {
            network: self.clone(),
            id: state.next_endpoint,
        }
    }

    /// Silently discard unreliable sends, like a lossy link would.
    pub fn set_drop_unreliable(&self, drop: bool) {
        self.state.lock().drop_unreliable = drop;
    }

    /// Simulates a link failure: both sides see a locally detected problem.
    pub fn sever(&self, conn_id: ConnId) {
        let mut state = self.state.lock();
        let Some(link) = state.links.remove(&conn_id) else {
            return;
        };
        let reason = ConnectionClosedReason::Disconnected;
        state.push_event(link.owner, conn_id, ConnectionChange::ProblemDetectedLocally(reason));
        if let Some(remote) = state.links.remove(&link.remote) {
            state.push_event(remote.owner, link.remote, ConnectionChange::ProblemDetectedLocally(reason));
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTransport {
    network: MemoryNetwork,
    id: EndpointId,
}

impl Transport for MemoryTransport {
    fn listen(&self, address: &str) -> Result<(), TransportError> {
        let mut state = self.network.state.lock();
        if state.listeners.contains_key(address) {
            return Err(TransportError::AddressInUse(address.to_owned()));
        }
        state.listeners.insert(address.to_owned(), self.id);
        Ok(())
    }

    fn stop_listening(&self) {
        self.network
            .state
            .lock()
            .listeners
            .retain(|_, owner| *owner != self.id);
    }

    fn connect(&self, address: &str) -> Result<ConnId, TransportError> {
        let mut state = self.network.state.lock();
        let listener = *state
            .listeners
            .get(address)
            .ok_or_else(|| TransportError::NoListener(address.to_owned()))?;

        state.next_conn += 1;
        let local = state.next_conn;
        state.next_conn += 1;
        let remote = state.next_conn;

        state.links.insert(
            local,
            Link {
                owner: self.id,
                remote,
                accepted: false,
                inbox: VecDeque::new(),
            },
        );
        state.links.insert(
            remote,
            Link {
                owner: listener,
                remote: local,
                accepted: false,
                inbox: VecDeque::new(),
            },
        );
        state.push_event(listener, remote, ConnectionChange::Connecting);
        debug!(local, remote, address, "memory connection requested");
        Ok(local)
    }

    fn accept(&self, conn_id: ConnId) -> Result<(), TransportError> {
        let mut state = self.network.state.lock();
        let link = state
            .links
            .get_mut(&conn_id)
            .ok_or(TransportError::UnknownConnection(conn_id))?;
        link.accepted = true;
        let remote = link.remote;
        let remote_owner = match state.links.get_mut(&remote) {
            Some(r) => {
                r.accepted = true;
                r.owner
            }
            None => return Err(TransportError::ConnectionClosed(conn_id)),
        };
        state.push_event(self.id, conn_id, ConnectionChange::Connected);
        state.push_event(remote_owner, remote, ConnectionChange::Connected);
        Ok(())
    }

    fn send(&self, conn_id: ConnId, data: Bytes, delivery: Delivery) -> Result<(), TransportError> {
        let mut state = self.network.state.lock();
        let drop_unreliable = state.drop_unreliable;
        let link = state
            .links
            .get(&conn_id)
            .ok_or(TransportError::ConnectionClosed(conn_id))?;
        if !link.accepted {
            return Err(TransportError::ConnectionClosed(conn_id));
        }
        if drop_unreliable && delivery == Delivery::Unreliable {
            return Ok(());
        }
        let remote = link.remote;
        match state.links.get_mut(&remote) {
            Some(r) => {
                r.inbox.push_back(data);
                Ok(())
            }
            None => Err(TransportError::ConnectionClosed(conn_id)),
        }
    }

    fn receive(&self, conn_id: ConnId) -> Vec<Bytes> {
        let mut state = self.network.state.lock();
        match state.links.get_mut(&conn_id) {
            Some(link) => link.inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    fn close(&self, conn_id: ConnId, reason: ConnectionClosedReason) {
        let mut state = self.network.state.lock();
        let Some(link) = state.links.remove(&conn_id) else {
            return;
        };
        if let Some(remote) = state.links.remove(&link.remote) {
            state.push_event(remote.owner, link.remote, ConnectionChange::ClosedByPeer(reason));
        }
        debug!(conn_id, %reason, "memory connection closed");
    }

    fn poll_events(&self) -> Vec<ConnectionEvent> {
        let mut state = self.network.state.lock();
        state
            .events
            .get_mut(&self.id)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }
}
