//! Stream framing for packages over TCP.
//!
//! Every frame is `[len: u32 LE][kind: u8][body]`, with `len` counting the
//! kind byte and the body. A data frame carries one encoded package; a close
//! frame carries the reason code the sender closed with.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ogonline_proto::ConnectionClosedReason;
use ogonline_proto::error::ProtoError;
use ogonline_proto::limits::MAX_FRAME;

const LEN_PREFIX: usize = 4;
const KIND_DATA: u8 = 0;
const KIND_CLOSE: u8 = 1;

/// Largest accepted `len` value.
pub const MAX_FRAME_LEN: usize = MAX_FRAME + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Bytes),
    Close(ConnectionClosedReason),
}

impl Frame {
    pub fn encode(&self) -> Bytes {
        let body_len = match self {
            Frame::Data(data) => data.len(),
            Frame::Close(_) => 4,
        };
        let mut buf = BytesMut::with_capacity(LEN_PREFIX + 1 + body_len);
        buf.put_u32_le((1 + body_len) as u32);
        match self {
            Frame::Data(data) => {
                buf.put_u8(KIND_DATA);
                buf.put_slice(data);
            }
            Frame::Close(reason) => {
                buf.put_u8(KIND_CLOSE);
                buf.put_u32_le(reason.code());
            }
        }
        buf.freeze()
    }
}

/// Keeps partial reads across calls and splits out complete frames.
pub struct TcpFramer {
    buf: BytesMut,
}

impl TcpFramer {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(initial_capacity),
        }
    }

    /// Buffer to read the socket into.
    pub fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Decodes every complete frame, leaving a trailing partial frame buffered.
    pub fn drain_frames(&mut self) -> Result<Vec<Frame>, ProtoError> {
        let mut out = Vec::new();
        while self.buf.len() >= LEN_PREFIX {
            let len = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
            if len == 0 {
                return Err(ProtoError::TooShort);
            }
            if len > MAX_FRAME_LEN {
                return Err(ProtoError::PayloadTooLarge(len));
            }
            if self.buf.len() < LEN_PREFIX + len {
                break;
            }
            self.buf.advance(LEN_PREFIX);
            let mut body = self.buf.split_to(len).freeze();
            let kind = body.get_u8();
            let frame = match kind {
                KIND_DATA => Frame::Data(body),
                KIND_CLOSE => {
                    if body.len() != 4 {
                        return Err(ProtoError::LengthMismatch);
                    }
                    Frame::Close(ConnectionClosedReason::from_code(body.get_u32_le()))
                }
                other => return Err(ProtoError::UnknownPackageType(other)),
            };
            out.push(frame);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_reads() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&Frame::Data(Bytes::from_static(b"hello")).encode());
        wire.extend_from_slice(&Frame::Close(ConnectionClosedReason::LobbyFull).encode());

        let mut framer = TcpFramer::new(64);
        framer.buf_mut().extend_from_slice(&wire[..7]);
        assert!(framer.drain_frames().unwrap().is_empty());

        framer.buf_mut().extend_from_slice(&wire[7..]);
        assert_eq!(
            framer.drain_frames().unwrap(),
            vec![
                Frame::Data(Bytes::from_static(b"hello")),
                Frame::Close(ConnectionClosedReason::LobbyFull),
            ]
        );
        assert!(framer.buf_mut().is_empty());
    }

    #[test]
    fn oversized_length_is_rejected_before_buffering() {
        let mut framer = TcpFramer::new(16);
        framer
            .buf_mut()
            .extend_from_slice(&((MAX_FRAME_LEN + 1) as u32).to_le_bytes());
        assert!(matches!(
            framer.drain_frames(),
            Err(ProtoError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let mut framer = TcpFramer::new(16);
        framer.buf_mut().extend_from_slice(&[1, 0, 0, 0, 9]);
        assert!(matches!(
            framer.drain_frames(),
            Err(ProtoError::UnknownPackageType(9))
        ));
    }
}
