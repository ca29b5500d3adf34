use crate::{
    constants::{HEADER_LEN, MAGIC, VERSION},
    error::ProtoError,
};

/// Package header (wire format).
///
/// Encoding rules:
/// - Fixed size: exactly `HEADER_LEN` bytes.
/// - Integer fields are little-endian.
/// - Layout is defined by `encode_into()` / `decode()` offsets below.
///
/// Decode rules:
/// - Requires `buf.len() >= HEADER_LEN`.
/// - Requires `buf[0..2] == MAGIC`.
/// - Requires `version == VERSION`.
/// - Requires `buf.len() == HEADER_LEN + payload_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    /// Wire-format version. `decode()` rejects versions != `VERSION`.
    pub version: u8,

    /// Kind of package. `decode()` does not validate it; the codec does.
    pub package_type: u8,

    /// Message type tag. Validated by the codec against the registry.
    pub message_type: u8,

    /// Bitfield, see `FLAG_COMPRESSED`.
    pub flags: u8,

    /// Size of the payload once decompressed.
    pub uncompressed_len: u32,

    /// Payload length in bytes as carried on the wire.
    pub payload_len: u32,
}

impl PackageHeader {
    pub const LEN: usize = HEADER_LEN;

    pub fn new(package_type: u8, message_type: u8) -> Self {
        Self {
            version: VERSION,
            package_type,
            message_type,
            flags: 0,
            uncompressed_len: 0,
            payload_len: 0,
        }
    }

    /// Offsets (bytes):
    /// - 0..2   magic
    /// - 2      version
    /// - 3      package_type
    /// - 4      message_type
    /// - 5      flags
    /// - 6..10  uncompressed_len (u32 LE)
    /// - 10..14 payload_len (u32 LE)
    pub fn encode_into(&self, out: &mut [u8; HEADER_LEN]) {
        out[0..2].copy_from_slice(&MAGIC);
        out[2] = self.version;
        out[3] = self.package_type;
        out[4] = self.message_type;
        out[5] = self.flags;
        out[6..10].copy_from_slice(&self.uncompressed_len.to_le_bytes());
        out[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
    }

    /// Decode a buffer that contains exactly `[Header][Payload]`.
    pub fn decode(buf: &[u8]) -> Result<(PackageHeader, &[u8]), ProtoError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtoError::TooShort);
        }
        if buf[0..2] != MAGIC {
            return Err(ProtoError::BadMagic);
        }

        let version = buf[2];
        if version != VERSION {
            return Err(ProtoError::UnsupportedVersion(version));
        }

        let uncompressed_len = read_u32_le(buf, 6)?;
        let payload_len = read_u32_le(buf, 10)?;
        if buf.len() != HEADER_LEN + payload_len as usize {
            return Err(ProtoError::LengthMismatch);
        }

        let h = PackageHeader {
            version,
            package_type: buf[3],
            message_type: buf[4],
            flags: buf[5],
            uncompressed_len,
            payload_len,
        };

        Ok((h, &buf[HEADER_LEN..]))
    }
}

fn read_u32_le(buf: &[u8], start: usize) -> Result<u32, ProtoError> {
    let bytes: [u8; 4] = buf
        .get(start..start + 4)
        .ok_or(ProtoError::TooShort)?
        .try_into()
        .map_err(|_| ProtoError::TooShort)?;
    Ok(u32::from_le_bytes(bytes))
}
