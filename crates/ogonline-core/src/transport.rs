//! Transport seam between the session and the wire.
//!
//! The session never touches sockets; it drives a [`Transport`] from the
//! network worker. Every call is non-blocking.

use bytes::Bytes;
use ogonline_proto::{ConnId, ConnectionClosedReason, Delivery};

use crate::error::TransportError;

pub mod memory;

/// Connection lifecycle changes reported by [`Transport::poll_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    /// A remote peer wants in; the host must [`Transport::accept`] it.
    Connecting,
    Connected,
    ClosedByPeer(ConnectionClosedReason),
    ProblemDetectedLocally(ConnectionClosedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub conn_id: ConnId,
    pub change: ConnectionChange,
}

pub trait Transport: Send + Sync {
    fn listen(&self, address: &str) -> Result<(), TransportError>;

    fn stop_listening(&self);

    /// Starts connecting to a listener. Completion is reported as a
    /// [`ConnectionChange::Connected`] event.
    fn connect(&self, address: &str) -> Result<ConnId, TransportError>;

    fn accept(&self, conn_id: ConnId) -> Result<(), TransportError>;

    fn send(&self, conn_id: ConnId, data: Bytes, delivery: Delivery) -> Result<(), TransportError>;

    /// Packages received on a connection since the last call, in order.
    fn receive(&self, conn_id: ConnId) -> Vec<Bytes>;

    /// Closes a connection, telling the remote side why.
    fn close(&self, conn_id: ConnId, reason: ConnectionClosedReason);

    fn poll_events(&self) -> Vec<ConnectionEvent>;
}
