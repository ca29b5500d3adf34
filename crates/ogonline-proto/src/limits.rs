//! Size limits for packages.
//!
//! Every limit is enforced on both encode and decode so that a peer can never
//! make us allocate more than these bounds.

/// Maximum uncompressed payload size (1 MiB).
///
/// Checked against the header's declared size before decompressing, so a
/// hostile header cannot trigger an unbounded allocation.
pub const MAX_UNCOMPRESSED_PAYLOAD: usize = 1024 * 1024;

/// Maximum payload size carried on the wire.
///
/// Compressed output is only used when it is smaller than the raw bytes, so
/// the wire payload never exceeds the uncompressed bound.
pub const MAX_WIRE_PAYLOAD: usize = MAX_UNCOMPRESSED_PAYLOAD;

/// Payloads at or below this size are sent uncompressed.
pub const COMPRESSION_THRESHOLD: usize = 64;

/// Maximum size of a single transport frame (header + payload).
pub const MAX_FRAME: usize = crate::constants::HEADER_LEN + MAX_WIRE_PAYLOAD;

/// Deepest allowed nesting of lists and objects in a message payload,
/// counting the payload object itself.
pub const MAX_VALUE_DEPTH: usize = 8;
