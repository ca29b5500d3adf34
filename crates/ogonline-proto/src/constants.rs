/// Magic bytes at the beginning of every package.
/// Used to quickly reject unrelated or corrupted data.
pub const MAGIC: [u8; 2] = *b"OG";

/// Wire-format protocol version.
/// Bump this only for breaking changes to the header layout or message formats.
pub const VERSION: u8 = 1;

/// Fixed package header length in bytes (wire format).
pub const HEADER_LEN: usize = 14;

/// Header flag: payload is lz4 block compressed.
pub const FLAG_COMPRESSED: u8 = 0b0000_0001;

/// Upper bound on bone transforms carried by a single movement update.
pub const MAX_NETWORK_BONES: usize = 64;

/// Morph target names longer than this are truncated on receive.
pub const MAX_MORPH_NAME_LEN: usize = 64;

/// Build id reported by development builds; admitted by any peer with a warning.
pub const DEVELOPMENT_BUILD_ID: i32 = -1;
