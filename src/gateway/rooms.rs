//! Room Router
//!
//! Tracks each connection's single active room and the per-room broadcast
//! groups. A switch swaps membership while holding the connection's entry
//! lock, so there is no window where the connection is in two groups or
//! in none.

use dashmap::DashMap;

use super::events::ConnectionId;

/// Per-connection room membership for broadcast scoping.
pub struct RoomRouter {
    /// Room id to member connection ids
    members: DashMap<i64, Vec<ConnectionId>>,
    /// Connection id to its current room
    current: DashMap<ConnectionId, i64>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
            current: DashMap::new(),
        }
    }

    /// Move a connection into a room, leaving its previous room if any.
    /// Returns the previous room id.
    pub fn switch(&self, connection_id: ConnectionId, room_id: i64) -> Option<i64> {
        // The entry guard on `current` serializes switches for this
        // connection; membership vectors are updated before it drops.
        let entry = self.current.entry(connection_id);
        let previous = match &entry {
            dashmap::mapref::entry::Entry::Occupied(e) => Some(*e.get()),
            dashmap::mapref::entry::Entry::Vacant(_) => None,
        };

        if previous == Some(room_id) {
            return previous;
        }

        if let Some(old_room) = previous {
            if let Some(mut conns) = self.members.get_mut(&old_room) {
                conns.retain(|c| *c != connection_id);
            }
        }
        self.members
            .entry(room_id)
            .or_default()
            .push(connection_id);
        entry.insert(room_id);

        previous
    }

    /// Remove a connection from its room. Returns the room it was in.
    pub fn leave(&self, connection_id: ConnectionId) -> Option<i64> {
        let (_, room_id) = self.current.remove(&connection_id)?;
        if let Some(mut conns) = self.members.get_mut(&room_id) {
            conns.retain(|c| *c != connection_id);
        }
        Some(room_id)
    }

    /// The room a connection is currently in.
    pub fn current_room(&self, connection_id: ConnectionId) -> Option<i64> {
        self.current.get(&connection_id).map(|r| *r)
    }

    /// The broadcast group for a room.
    pub fn members(&self, room_id: i64) -> Vec<ConnectionId> {
        self.members
            .get(&room_id)
            .map(|conns| conns.clone())
            .unwrap_or_default()
    }
}

impl Default for RoomRouter {
    fn default() -> Self {
        Self::new()
    }
}
