//! Fan-out of session messages to every registered endpoint.
//!
//! Each bus path owns one [`BroadcastGroup`]. Messages go to all members,
//! the sender included; dropping echoes is the receiver's job.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::envelope::OriginId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub messages_sent: u64,
    pub messages_undelivered: u64,
    pub active_members: usize,
}

/// Lock-free counters for the publish path.
#[derive(Default)]
struct AtomicGroupStats {
    messages_sent: AtomicU64,
    messages_undelivered: AtomicU64,
}

pub struct BroadcastGroup {
    sender: broadcast::Sender<Arc<Vec<u8>>>,
    members: Arc<RwLock<HashSet<OriginId>>>,
    capacity: usize,
    atomic_stats: Arc<AtomicGroupStats>,
}

impl BroadcastGroup {
    /// `capacity` is how many messages a slow member may fall behind before
    /// it starts losing the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            members: Arc::new(RwLock::new(HashSet::new())),
            capacity,
            atomic_stats: Arc::new(AtomicGroupStats::default()),
        }
    }

    /// Register `origin` and return its receiver. `None` if the origin is
    /// already a member.
    pub async fn add_member(&self, origin: OriginId) -> Option<broadcast::Receiver<Arc<Vec<u8>>>> {
        let mut members = self.members.write().await;
        if !members.insert(origin) {
            return None;
        }
        Some(self.sender.subscribe())
    }

    pub async fn remove_member(&self, origin: &OriginId) -> bool {
        self.members.write().await.remove(origin)
    }

    /// Send to every member. Returns the number of receivers reached.
    pub fn publish(&self, message: Arc<Vec<u8>>) -> usize {
        self.atomic_stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(message) {
            Ok(count) => count,
            Err(_) => {
                self.atomic_stats.messages_undelivered.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn has_member(&self, origin: &OriginId) -> bool {
        self.members.read().await.contains(origin)
    }

    pub async fn stats(&self) -> GroupStats {
        GroupStats {
            messages_sent: self.atomic_stats.messages_sent.load(Ordering::Relaxed),
            messages_undelivered: self.atomic_stats.messages_undelivered.load(Ordering::Relaxed),
            active_members: self.member_count().await,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Bus path → broadcast group.
pub struct SessionRooms {
    rooms: Arc<RwLock<HashMap<String, Arc<BroadcastGroup>>>>,
    default_capacity: usize,
}

impl SessionRooms {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            default_capacity,
        }
    }

    pub async fn get_or_create(&self, path: &str) -> Arc<BroadcastGroup> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(path) {
                return room.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        // Another task may have created it between the two locks.
        if let Some(room) = rooms.get(path) {
            return room.clone();
        }
        let room = Arc::new(BroadcastGroup::new(self.default_capacity));
        rooms.insert(path.to_string(), room.clone());
        log::debug!("Opened bus path {}", path);
        room
    }

    pub async fn get(&self, path: &str) -> Option<Arc<BroadcastGroup>> {
        self.rooms.read().await.get(path).cloned()
    }

    pub async fn remove_if_empty(&self, path: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(path) {
            if room.member_count().await == 0 {
                rooms.remove(path);
                log::debug!("Closed bus path {}", path);
                return true;
            }
        }
        false
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn active_paths(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }
}
