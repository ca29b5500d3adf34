use strum::FromRepr;

use crate::{
    constants::{FLAG_COMPRESSED, HEADER_LEN},
    error::ProtoError,
    header::PackageHeader,
    limits::{COMPRESSION_THRESHOLD, MAX_UNCOMPRESSED_PAYLOAD, MAX_WIRE_PAYLOAD},
    messages::OnlineMessage,
    msg_type::MessageType,
    value::{FieldReader, Object},
};

/// Kind of package carried in the header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum PackageType {
    /// A single [`OnlineMessage`].
    MessageObject = 1,
}

/// Result of decoding one package.
#[derive(Debug)]
pub struct DecodedPackage {
    pub message: OnlineMessage,
    /// Fields that were absent and left at their defaults.
    pub missing_fields: Vec<&'static str>,
}

/// Encode a message into a self-contained package.
///
/// The message is serialized into an [`Object`], written with postcard and
/// compressed when that makes the payload smaller.
pub fn encode_package(message: &OnlineMessage) -> Result<Vec<u8>, ProtoError> {
    let raw = message.serialize().to_bytes()?;
    if raw.len() > MAX_UNCOMPRESSED_PAYLOAD {
        return Err(ProtoError::PayloadTooLarge(raw.len()));
    }

    let mut header = PackageHeader::new(PackageType::MessageObject as u8, message.message_type() as u8);
    header.uncompressed_len = raw.len() as u32;

    let payload = if raw.len() > COMPRESSION_THRESHOLD {
        let compressed = lz4_flex::block::compress(&raw);
        if compressed.len() < raw.len() {
            header.flags |= FLAG_COMPRESSED;
            compressed
        } else {
            raw
        }
    } else {
        raw
    };
    header.payload_len = payload.len() as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    let mut hbuf = [0u8; HEADER_LEN];
    header.encode_into(&mut hbuf);
    out.extend_from_slice(&hbuf);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a package produced by [`encode_package`].
///
/// Unknown package or message types reject the whole buffer. Fields missing
/// from an otherwise valid payload keep their defaults and are reported in
/// [`DecodedPackage::missing_fields`].
pub fn decode_package(buf: &[u8]) -> Result<DecodedPackage, ProtoError> {
    let (header, payload) = PackageHeader::decode(buf)?;

    if PackageType::from_repr(header.package_type).is_none() {
        return Err(ProtoError::UnknownPackageType(header.package_type));
    }
    let message_type = MessageType::from_repr(header.message_type)
        .ok_or(ProtoError::UnknownMessageType(header.message_type))?;

    if payload.len() > MAX_WIRE_PAYLOAD {
        return Err(ProtoError::PayloadTooLarge(payload.len()));
    }
    let uncompressed_len = header.uncompressed_len as usize;
    if uncompressed_len > MAX_UNCOMPRESSED_PAYLOAD {
        return Err(ProtoError::PayloadTooLarge(uncompressed_len));
    }

    let object = if header.flags & FLAG_COMPRESSED != 0 {
        let raw = lz4_flex::block::decompress(payload, uncompressed_len)?;
        if raw.len() != uncompressed_len {
            return Err(ProtoError::LengthMismatch);
        }
        Object::from_bytes(&raw)?
    } else {
        if payload.len() != uncompressed_len {
            return Err(ProtoError::LengthMismatch);
        }
        Object::from_bytes(payload)?
    };

    let mut message = OnlineMessage::construct(message_type);
    let mut reader = FieldReader::new(&object);
    message.deserialize_into(&mut reader);
    let missing_fields = reader.finish(&format!("{message_type:?}"));

    Ok(DecodedPackage {
        message,
        missing_fields,
    })
}
