//! Network worker: moves bytes between the transport and the session queues.
//!
//! One [`NetworkWorker::step`] accepts or rejects new connections, decodes
//! everything received, flushes the outgoing queue and finally closes the
//! connections that were asked to close. Messages queued before a close
//! request therefore still go out.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use ogonline_proto::codec::{decode_package, encode_package};
use ogonline_proto::{ConnId, ConnectionClosedReason, MessageCategory};
use tracing::{debug, error, info, trace, warn};

use crate::message_ref::OnlineMessageRef;
use crate::peer::Route;
use crate::queues::{IncomingMessage, Outgoing, Target};
use crate::session::{OnlineSession, SessionEvent};
use crate::transport::{ConnectionChange, Transport};

pub struct NetworkWorker {
    session: Arc<OnlineSession>,
    transport: Arc<dyn Transport>,
}

impl NetworkWorker {
    pub fn new(session: Arc<OnlineSession>, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    pub fn step(&self) {
        self.handle_connection_events();
        self.receive_packages();
        self.flush_outgoing();
        self.handle_close_requests();
    }

    fn handle_connection_events(&self) {
        for event in self.transport.poll_events() {
            let conn_id = event.conn_id;
            match event.change {
                ConnectionChange::Connecting => {
                    if !self.session.is_host() {
                        continue;
                    }
                    match self.transport.accept(conn_id) {
                        Ok(()) => self
                            .session
                            .add_local_chat(format!("Accepted connection: {conn_id}")),
                        Err(e) => {
                            warn!(conn_id, error = %e, "failed to accept connection");
                            self.session
                                .add_local_chat(format!("{conn_id} failed to accept connection: ({e})"));
                        }
                    }
                }
                ConnectionChange::Connected => self.on_connected(conn_id),
                ConnectionChange::ClosedByPeer(reason) => {
                    info!(conn_id, %reason, "connection closed by peer");
                    self.close_immediate(conn_id, reason);
                }
                ConnectionChange::ProblemDetectedLocally(reason) => {
                    warn!(conn_id, %reason, "connection problem detected locally");
                    self.close_immediate(conn_id, reason);
                }
            }
        }
    }

    fn on_connected(&self, conn_id: ConnId) {
        if !self.session.is_host() {
            let peer = self.session.peers.lock().add_host(conn_id);
            info!(conn_id, "connected to host");
            self.session.events.push(SessionEvent::PeerConnected {
                peer_id: peer.peer_id,
                conn_id,
            });
            return;
        }

        // The host itself occupies one slot.
        let occupied = self.session.peers.lock().len() + 1;
        if occupied >= self.session.player_limit {
            info!(conn_id, occupied, limit = self.session.player_limit, "lobby full, rejecting");
            self.session
                .add_local_chat(format!("Rejected connection {conn_id}: the lobby is full"));
            self.transport
                .close(conn_id, ConnectionClosedReason::LobbyFull);
            return;
        }

        let peer = self.session.peers.lock().add_client(conn_id);
        info!(conn_id, peer_id = peer.peer_id, "peer connected");
        self.session.events.push(SessionEvent::PeerConnected {
            peer_id: peer.peer_id,
            conn_id,
        });
    }

    fn receive_packages(&self) {
        let peers = self
            .session
            .peers
            .lock()
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        for peer in peers {
            for buf in self.transport.receive(peer.conn_id) {
                match decode_package(&buf) {
                    Ok(decoded) => {
                        let message = OnlineMessageRef::new(decoded.message);
                        trace!(peer_id = peer.peer_id, message_type = ?message.message_type(), "received");
                        self.session.incoming.push(IncomingMessage {
                            from: peer.peer_id,
                            message,
                        });
                    }
                    Err(e) => {
                        warn!(conn_id = peer.conn_id, peer_id = peer.peer_id, error = %e, "dropping undecodable package");
                    }
                }
            }
        }
    }

    fn flush_outgoing(&self) {
        let hosting = self.session.is_host();
        let mut routes = self.session.peers.lock().routes(hosting);

        for item in self.session.outgoing.drain() {
            match item {
                Outgoing::Message { target, message } => {
                    self.send_message(&routes, target, &message, hosting);
                }
                Outgoing::ReplayPersistentLog { conn_id } => {
                    let Some(route) = routes.iter_mut().find(|r| r.conn_id == conn_id) else {
                        debug!(conn_id, "replay for a connection that is gone");
                        continue;
                    };
                    let log = self.session.persistent.snapshot();
                    for message in &log {
                        self.send_encoded(route.conn_id, message);
                    }
                    route.has_persistent_queue = true;
                    self.session
                        .peers
                        .lock()
                        .connections
                        .set_persistent_queue_sent(conn_id);
                    debug!(conn_id, count = log.len(), "persistent log replayed");
                }
            }
        }
    }

    fn send_message(&self, routes: &[Route], target: Target, message: &OnlineMessageRef, hosting: bool) {
        let data = match encode_package(message.data()) {
            Ok(d) => Bytes::from(d),
            Err(e) => {
                error!(message_type = ?message.message_type(), error = %e, "failed to encode message");
                return;
            }
        };
        let delivery = message.data().delivery();
        let gated = hosting && !message.category().bypasses_replay_gate();

        let mut target_found = false;
        for route in routes {
            if let Target::Connection(conn_id) = target {
                if conn_id != route.conn_id {
                    continue;
                }
                target_found = true;
            }
            if gated && !route.has_persistent_queue {
                trace!(peer_id = route.peer_id, message_type = ?message.message_type(), "withheld until replay");
                continue;
            }
            if let Err(e) = self.transport.send(route.conn_id, data.clone(), delivery) {
                debug!(conn_id = route.conn_id, error = %e, "send failed");
            }
        }

        if let Target::Connection(conn_id) = target {
            if !target_found {
                debug!(conn_id, message_type = ?message.message_type(), "dropping message for closed connection");
            }
        }

        if hosting && target == Target::Broadcast && message.category() == MessageCategory::LevelPersistent {
            self.session.persistent.append(message.clone());
        }
    }

    fn send_encoded(&self, conn_id: ConnId, message: &OnlineMessageRef) {
        match encode_package(message.data()) {
            Ok(d) => {
                if let Err(e) = self
                    .transport
                    .send(conn_id, Bytes::from(d), message.data().delivery())
                {
                    debug!(conn_id, error = %e, "send failed");
                }
            }
            Err(e) => error!(message_type = ?message.message_type(), error = %e, "failed to encode message"),
        }
    }

    fn handle_close_requests(&self) {
        for request in self.session.close_requests.drain() {
            self.close_immediate(request.conn_id, request.reason);
        }
    }

    fn close_immediate(&self, conn_id: ConnId, reason: ConnectionClosedReason) {
        self.transport.close(conn_id, reason);
        let removed = self.session.peers.lock().remove_by_conn(conn_id, reason);
        if let Some(peer) = removed {
            info!(conn_id, peer_id = peer.peer_id, %reason, "connection closed");
            self.session.events.push(SessionEvent::PeerDisconnected {
                peer_id: peer.peer_id,
                conn_id,
                reason,
            });
        }
    }
}

/// The worker running on its own thread.
pub struct NetworkThread {
    session: Arc<OnlineSession>,
    handle: Option<JoinHandle<()>>,
}

impl NetworkThread {
    pub fn spawn(worker: NetworkWorker, tick: Duration) -> io::Result<Self> {
        let session = worker.session.clone();
        let handle = thread::Builder::new()
            .name("ogonline-net".to_owned())
            .spawn(move || {
                debug!("network thread started");
                while !worker.session.is_stopping() {
                    worker.step();
                    thread::sleep(tick);
                }
                // Last flush so goodbye messages and closes go out.
                worker.step();
                debug!("network thread stopped");
            })?;
        Ok(Self {
            session,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.session.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("network thread panicked");
            }
        }
    }
}

impl Drop for NetworkThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
