use dashmap::DashMap;
use std::collections::HashMap;
use std::time::Instant;

use super::message::Message;
use crate::state::{AgentId, Position};

/// Last known state of one peer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerEntry {
    pub position: Position,
    pub last_seen: Instant,
}

/// Effect of applying one message to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    /// First announce from this peer
    Joined,
    /// Known peer re-announced
    Moved,
    /// Known peer removed
    Departed,
    /// Departure for a peer we never knew
    Unchanged,
}

impl TableChange {
    /// True when the table size changed
    pub fn is_membership_change(self) -> bool {
        matches!(self, TableChange::Joined | TableChange::Departed)
    }
}

/// Per-agent view of the live swarm
///
/// Upsert and remove are atomic per key, so the size-change signal
/// ([`TableChange`]) is exact even with concurrent snapshot readers.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: DashMap<AgentId, PeerEntry>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Insert or refresh a peer
    pub fn upsert(&self, id: AgentId, position: Position, now: Instant) -> TableChange {
        let previous = self.peers.insert(
            id,
            PeerEntry {
                position,
                last_seen: now,
            },
        );
        match previous {
            None => TableChange::Joined,
            Some(_) => TableChange::Moved,
        }
    }

    /// Remove a peer if present
    pub fn remove(&self, id: &AgentId) -> TableChange {
        match self.peers.remove(id) {
            Some(_) => TableChange::Departed,
            None => TableChange::Unchanged,
        }
    }

    /// Apply a decoded message. Callers filter out their own id first.
    pub fn apply(&self, message: &Message, now: Instant) -> TableChange {
        match message {
            Message::Announce { id, position } => self.upsert(id.clone(), *position, now),
            Message::Depart { id } => self.remove(id),
        }
    }

    /// Evict peers not heard from since `cutoff`; returns the evicted ids
    pub fn expire_older_than(&self, cutoff: Instant) -> Vec<AgentId> {
        let stale: Vec<AgentId> = self
            .peers
            .iter()
            .filter(|entry| entry.value().last_seen < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        // Re-check under the shard lock: an announce may have landed since the scan.
        stale
            .into_iter()
            .filter(|id| {
                self.peers
                    .remove_if(id, |_, entry| entry.last_seen < cutoff)
                    .is_some()
            })
            .collect()
    }

    pub fn get(&self, id: &AgentId) -> Option<PeerEntry> {
        self.peers.get(id).map(|entry| *entry.value())
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.peers.contains_key(id)
    }

    /// Point-in-time copy, safe to hand to consumers
    pub fn snapshot(&self) -> HashMap<AgentId, Position> {
        self.peers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().position))
            .collect()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.peers.iter().map(|entry| entry.value().position).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
