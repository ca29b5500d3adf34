//! State shared between the main thread and the network worker for the
//! lifetime of one multiplayer session.
//!
//! Every resource has its own lock and no code path holds two at once.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use ogonline_proto::messages::PlayerState;
use ogonline_proto::{ConnId, ConnectionClosedReason, PeerId, PlayerId};
use parking_lot::Mutex;

use crate::chat::ChatLog;
use crate::config::OnlineConfig;
use crate::peer::PeerTable;
use crate::queues::{IncomingMessage, MessageQueue, Outgoing, PersistentLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Client,
}

/// Network-side happenings the main thread must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PeerConnected {
        peer_id: PeerId,
        conn_id: ConnId,
    },
    PeerDisconnected {
        peer_id: PeerId,
        conn_id: ConnId,
        reason: ConnectionClosedReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseRequest {
    pub conn_id: ConnId,
    pub reason: ConnectionClosedReason,
}

/// Binding names and the ids they travel as.
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    by_name: BTreeMap<String, u8>,
    by_id: BTreeMap<u8, String>,
}

impl BindingTable {
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self::default();
        for (id, name) in names.into_iter().enumerate() {
            let Ok(id) = u8::try_from(id) else {
                break;
            };
            table.insert(name.to_owned(), id);
        }
        table
    }

    pub fn insert(&mut self, name: String, id: u8) {
        self.by_id.insert(id, name.clone());
        self.by_name.insert(name, id);
    }

    pub fn id(&self, name: &str) -> Option<u8> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: u8) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn pairs(&self) -> Vec<(String, u8)> {
        self.by_name.iter().map(|(n, i)| (n.clone(), *i)).collect()
    }
}

/// Avatars available to joining players.
#[derive(Debug, Default)]
pub struct AvatarPool {
    free: Vec<i32>,
    taken: Vec<i32>,
}

impl AvatarPool {
    pub fn add_free(&mut self, id: i32) {
        if !self.taken.contains(&id) && !self.free.contains(&id) {
            self.free.push(id);
        }
    }

    /// Takes the oldest free avatar.
    pub fn take(&mut self) -> Option<i32> {
        if self.free.is_empty() {
            return None;
        }
        let id = self.free.remove(0);
        self.taken.push(id);
        Some(id)
    }

    pub fn mark_taken(&mut self, id: i32) {
        self.free.retain(|f| *f != id);
        if !self.taken.contains(&id) {
            self.taken.push(id);
        }
    }

    /// Returns a taken avatar to the pool.
    pub fn release(&mut self, id: i32) {
        self.taken.retain(|t| *t != id);
        self.add_free(id);
    }

    /// Forgets an avatar entirely, e.g. when it was removed from the scene.
    pub fn forget(&mut self, id: i32) {
        self.taken.retain(|t| *t != id);
        self.free.retain(|f| *f != id);
    }

    pub fn free(&self) -> &[i32] {
        &self.free
    }

    pub fn clear(&mut self) {
        self.free.clear();
        self.taken.clear();
    }
}

pub struct OnlineSession {
    role: Role,
    pub player_limit: usize,

    pub peers: Mutex<PeerTable>,
    pub player_states: Mutex<BTreeMap<PlayerId, PlayerState>>,
    pub outgoing: MessageQueue<Outgoing>,
    pub incoming: MessageQueue<IncomingMessage>,
    pub persistent: PersistentLog,
    pub close_requests: MessageQueue<CloseRequest>,
    pub events: MessageQueue<SessionEvent>,
    pub chat: Mutex<ChatLog>,
    pub host_session_flags: Mutex<BTreeMap<u8, bool>>,
    pub bindings: Mutex<BindingTable>,
    pub avatars: Mutex<AvatarPool>,

    local_player_id: AtomicI32,
    stopping: AtomicBool,
}

impl OnlineSession {
    pub fn new(role: Role, config: &OnlineConfig) -> Self {
        Self {
            role,
            player_limit: config.player_limit,
            peers: Mutex::new(PeerTable::new()),
            player_states: Mutex::new(BTreeMap::new()),
            outgoing: MessageQueue::new(),
            incoming: MessageQueue::new(),
            persistent: PersistentLog::new(),
            close_requests: MessageQueue::new(),
            events: MessageQueue::new(),
            chat: Mutex::new(ChatLog::new(config.max_chat_lines, config.max_chat_age)),
            host_session_flags: Mutex::new(BTreeMap::new()),
            bindings: Mutex::new(BindingTable::from_names(
                config.bindings.iter().map(String::as_str),
            )),
            avatars: Mutex::new(AvatarPool::default()),
            local_player_id: AtomicI32::new(ogonline_proto::ids::HOST_PLAYER_ID),
            stopping: AtomicBool::new(false),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn local_player_id(&self) -> PlayerId {
        self.local_player_id.load(Ordering::Acquire)
    }

    pub fn set_local_player_id(&self, id: PlayerId) {
        self.local_player_id.store(id, Ordering::Release);
    }

    pub fn player_count(&self) -> usize {
        self.player_states.lock().len()
    }

    pub fn add_local_chat(&self, text: impl Into<String>) {
        self.chat.lock().add(text);
    }

    pub fn request_close(&self, conn_id: ConnId, reason: ConnectionClosedReason) {
        self.close_requests.push(CloseRequest { conn_id, reason });
    }

    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_pool_hands_out_oldest_first() {
        let mut pool = AvatarPool::default();
        pool.add_free(3);
        pool.add_free(1);
        pool.add_free(3);
        assert_eq!(pool.take(), Some(3));
        assert_eq!(pool.take(), Some(1));
        assert_eq!(pool.take(), None);

        pool.release(3);
        assert_eq!(pool.free(), [3]);
        pool.forget(3);
        assert!(pool.free().is_empty());
    }

    #[test]
    fn bindings_map_both_ways() {
        let table = BindingTable::from_names(["jump", "attack"]);
        assert_eq!(table.id("attack"), Some(1));
        assert_eq!(table.name(0), Some("jump"));
        assert_eq!(table.pairs().len(), 2);
    }
}
