use serde::{Deserialize, Serialize};

/// Lifetime class of a message, which decides who receives it and whether it
/// is kept for late joiners.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCategory {
    /// Delivered live only; bypasses the persistent-queue gate.
    Transient = 0,
    /// Relevant for the current level only; never stored.
    LevelTransient = 1,
    /// Appended to the persistent log after the live send and replayed to
    /// peers that connect later in the same level.
    LevelPersistent = 2,
}

impl MessageCategory {
    /// Whether peers still waiting on the persistent replay may receive it.
    pub const fn bypasses_replay_gate(self) -> bool {
        matches!(self, MessageCategory::Transient)
    }
}

/// Delivery guarantee requested from the transport.
///
/// Transports that only have one reliable stream send everything reliably.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delivery {
    Reliable = 0,
    Unreliable = 1,
}
