//! Session error types.

use ogonline_proto::{ConnId, ProtoError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnId),

    #[error("unknown connection {0}")]
    UnknownConnection(ConnId),

    #[error("nobody is listening on {0}")]
    NoListener(String),

    #[error("address already in use: {0}")]
    AddressInUse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum OnlineError {
    #[error("a session is already active")]
    AlreadyActive,

    #[error("no active session")]
    NotActive,

    #[error("only the host can do this")]
    NotHost,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),

    #[error("failed to start network thread: {0}")]
    Thread(std::io::Error),
}
