//! Wire-level vocabulary shared by every ogonline peer.
//!
//! - [`value`]: the structured key/value container every message payload is written into
//! - [`messages`]: the message structs and the [`messages::OnlineMessage`] tagged union
//! - [`codec`]: package framing, compression and the construct-by-tag factory
//! - [`reason`]: connection-closed reason codes

pub mod category;
pub mod codec;
pub mod constants;
pub mod error;
pub mod header;
pub mod ids;
pub mod limits;
pub mod math;
pub mod messages;
pub mod msg_type;
pub mod reason;
pub mod value;

pub use category::{Delivery, MessageCategory};
pub use error::ProtoError;
pub use ids::{ConnId, ObjectId, PeerId, PlayerId};
pub use messages::{Message, MessageKind, OnlineMessage};
pub use msg_type::MessageType;
pub use reason::ConnectionClosedReason;
pub use value::{FieldReader, Object, Value};
