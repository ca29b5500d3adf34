use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use ogonline_proto::ConnId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Sender for already-framed bytes headed to one socket.
pub type OutboundTx = mpsc::UnboundedSender<Bytes>;

/// Book-keeping for one open socket.
///
/// Packages read by the connection task wait in `inbox` until the session
/// worker collects them.
#[derive(Debug)]
pub struct ConnHandle {
    pub outbound: OutboundTx,
    pub inbox: VecDeque<Bytes>,
    pub accepted: bool,
    pub cancel: CancellationToken,
}
