use thiserror::Error;

use crate::constants::HEADER_LEN;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
    #[error("buffer too short (need at least {HEADER_LEN} bytes)")]
    TooShort,
    #[error("payload length mismatch")]
    LengthMismatch,
    #[error("payload too large: {0}")]
    PayloadTooLarge(usize),
    #[error("unknown package type: {0}")]
    UnknownPackageType(u8),
    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),
    #[error("lz4 decompression failed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}
