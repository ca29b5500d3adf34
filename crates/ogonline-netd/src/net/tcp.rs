//! [`Transport`] over TCP, driven by its own tokio runtime.
//!
//! The session worker calls in synchronously; socket I/O runs on runtime
//! tasks. Each socket gets a reader task that fills the connection inbox and
//! a writer task fed through an unbounded channel.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use ogonline_core::{ConnectionChange, ConnectionEvent, Transport, TransportError};
use ogonline_proto::{ConnId, ConnectionClosedReason, Delivery};
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::framing::{Frame, TcpFramer};
use super::inbound::{ConnHandle, next_conn_id};
use super::outbound::spawn_writer;

/// Per-socket receive buffer hint.
const RX_BUFFER: usize = 8 * 1024;

struct Shared {
    handle: Handle,
    conns: Mutex<HashMap<ConnId, ConnHandle>>,
    listener: Mutex<Option<CancellationToken>>,
    events_tx: crossbeam_channel::Sender<ConnectionEvent>,
    events_rx: crossbeam_channel::Receiver<ConnectionEvent>,
}

impl Shared {
    fn emit(&self, conn_id: ConnId, change: ConnectionChange) {
        // Both ends live in `Shared`, so the channel never disconnects.
        let _ = self.events_tx.send(ConnectionEvent { conn_id, change });
    }

    fn register(self: &Arc<Self>, stream: TcpStream, accepted: bool) -> ConnId {
        let conn_id = next_conn_id();
        let _ = stream.set_nodelay(true);
        let (read, write) = stream.into_split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        self.conns.lock().insert(
            conn_id,
            ConnHandle {
                outbound: out_tx,
                inbox: VecDeque::new(),
                accepted,
                cancel: cancel.clone(),
            },
        );

        let _guard = self.handle.enter();
        spawn_writer(FramedWrite::new(write, BytesCodec::new()), out_rx);
        let shared = self.clone();
        tokio::spawn(async move { shared.read_loop(conn_id, read, cancel).await });
        conn_id
    }

    async fn read_loop(self: Arc<Self>, conn_id: ConnId, mut read: OwnedReadHalf, cancel: CancellationToken) {
        let mut framer = TcpFramer::new(RX_BUFFER);
        let change = 'read: loop {
            framer.buf_mut().reserve(4096);
            let read_res = tokio::select! {
                res = read.read_buf(framer.buf_mut()) => res,
                _ = cancel.cancelled() => return,
            };
            match read_res {
                Ok(0) => break ConnectionChange::ClosedByPeer(ConnectionClosedReason::Disconnected),
                Ok(_) => {}
                Err(e) => {
                    debug!(conn_id, error = %e, "read failed");
                    break ConnectionChange::ProblemDetectedLocally(ConnectionClosedReason::Disconnected);
                }
            }

            let frames = match framer.drain_frames() {
                Ok(frames) => frames,
                Err(e) => {
                    warn!(conn_id, error = %e, "malformed frame");
                    self.close_conn(conn_id, ConnectionClosedReason::BadRequest);
                    self.emit(
                        conn_id,
                        ConnectionChange::ProblemDetectedLocally(ConnectionClosedReason::BadRequest),
                    );
                    return;
                }
            };
            for frame in frames {
                match frame {
                    Frame::Data(data) => match self.conns.lock().get_mut(&conn_id) {
                        Some(conn) => conn.inbox.push_back(data),
                        None => return,
                    },
                    Frame::Close(reason) => break 'read ConnectionChange::ClosedByPeer(reason),
                }
            }
        };

        // A locally closed connection has already been removed.
        if self.conns.lock().remove(&conn_id).is_some() {
            self.emit(conn_id, change);
        }
    }

    /// Sends a close frame and forgets the connection. The writer drains and
    /// shuts the socket down once the handle is dropped.
    fn close_conn(&self, conn_id: ConnId, reason: ConnectionClosedReason) -> bool {
        let Some(conn) = self.conns.lock().remove(&conn_id) else {
            return false;
        };
        let _ = conn.outbound.send(Frame::Close(reason).encode());
        conn.cancel.cancel();
        true
    }
}

pub struct TcpTransport {
    shared: Arc<Shared>,
    runtime: Runtime,
}

impl TcpTransport {
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("ogonline-tcp")
            .enable_all()
            .build()?;
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Ok(Self {
            shared: Arc::new(Shared {
                handle: runtime.handle().clone(),
                conns: Mutex::new(HashMap::new()),
                listener: Mutex::new(None),
                events_tx,
                events_rx,
            }),
            runtime,
        })
    }

    /// Address the listener is bound to, once listening.
    pub fn listen_on(&self, address: &str) -> Result<std::net::SocketAddr, TransportError> {
        let listener = self
            .runtime
            .block_on(TcpListener::bind(address))
            .map_err(|e| match e.kind() {
                io::ErrorKind::AddrInUse => TransportError::AddressInUse(address.to_owned()),
                _ => TransportError::Io(e),
            })?;
        let local = listener.local_addr()?;

        let cancel = CancellationToken::new();
        if let Some(previous) = self.shared.listener.lock().replace(cancel.clone()) {
            previous.cancel();
        }
        let shared = self.shared.clone();
        self.runtime.spawn(async move {
            loop {
                let accepted = tokio::select! {
                    res = listener.accept() => res,
                    _ = cancel.cancelled() => break,
                };
                match accepted {
                    Ok((stream, peer)) => {
                        let conn_id = shared.register(stream, false);
                        info!(conn_id, %peer, "incoming connection");
                        shared.emit(conn_id, ConnectionChange::Connecting);
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            debug!("listener stopped");
        });
        info!(%local, "listening");
        Ok(local)
    }
}

impl Transport for TcpTransport {
    fn listen(&self, address: &str) -> Result<(), TransportError> {
        self.listen_on(address).map(|_| ())
    }

    fn stop_listening(&self) {
        if let Some(cancel) = self.shared.listener.lock().take() {
            cancel.cancel();
        }
    }

    fn connect(&self, address: &str) -> Result<ConnId, TransportError> {
        let stream = self.runtime.block_on(TcpStream::connect(address))?;
        let conn_id = self.shared.register(stream, true);
        info!(conn_id, address, "connected");
        self.shared.emit(conn_id, ConnectionChange::Connected);
        Ok(conn_id)
    }

    fn accept(&self, conn_id: ConnId) -> Result<(), TransportError> {
        match self.shared.conns.lock().get_mut(&conn_id) {
            Some(conn) => conn.accepted = true,
            None => return Err(TransportError::UnknownConnection(conn_id)),
        }
        self.shared.emit(conn_id, ConnectionChange::Connected);
        Ok(())
    }

    /// TCP is always reliable and ordered, so `delivery` is not consulted.
    fn send(&self, conn_id: ConnId, data: Bytes, _delivery: Delivery) -> Result<(), TransportError> {
        let conns = self.shared.conns.lock();
        let conn = conns
            .get(&conn_id)
            .filter(|c| c.accepted)
            .ok_or(TransportError::ConnectionClosed(conn_id))?;
        conn.outbound
            .send(Frame::Data(data).encode())
            .map_err(|_| TransportError::ConnectionClosed(conn_id))
    }

    fn receive(&self, conn_id: ConnId) -> Vec<Bytes> {
        match self.shared.conns.lock().get_mut(&conn_id) {
            Some(conn) => conn.inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    fn close(&self, conn_id: ConnId, reason: ConnectionClosedReason) {
        if self.shared.close_conn(conn_id, reason) {
            debug!(conn_id, %reason, "connection closed");
        }
    }

    fn poll_events(&self) -> Vec<ConnectionEvent> {
        self.shared.events_rx.try_iter().collect()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.stop_listening();
        let conns = self
            .shared
            .conns
            .lock()
            .keys()
            .copied()
            .collect::<Vec<_>>();
        for conn_id in conns {
            self.shared
                .close_conn(conn_id, ConnectionClosedReason::Disconnected);
        }
    }
}
