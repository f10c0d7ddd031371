//! Presence Tracker
//!
//! In-memory map of connection to principal, plus per-room typing state.
//! Presence is global, not per-room: every register/unregister triggers a
//! full recomputation and broadcast of the online list to all connections.
//! A username is online while at least one connection maps to it.

use dashmap::DashMap;

use super::events::ConnectionId;
use crate::domain::Principal;

/// Tracks which principals are connected and who is typing where.
///
/// Typing state is keyed by (room, connection) so a user typing in two
/// rooms from two devices is tracked independently.
pub struct PresenceTracker {
    online: DashMap<ConnectionId, Principal>,
    typing: DashMap<i64, Vec<(ConnectionId, String)>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            online: DashMap::new(),
            typing: DashMap::new(),
        }
    }

    /// Register a connection's principal.
    pub fn register(&self, connection_id: ConnectionId, principal: Principal) {
        self.online.insert(connection_id, principal);
    }

    /// Unregister a connection.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Principal> {
        self.online.remove(&connection_id).map(|(_, p)| p)
    }

    /// Distinct online usernames, sorted for stable client rendering.
    pub fn list_online(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .online
            .iter()
            .map(|entry| entry.value().username.clone())
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Whether a username has at least one registered connection.
    pub fn is_online(&self, username: &str) -> bool {
        self.online
            .iter()
            .any(|entry| entry.value().username == username)
    }

    /// Set or clear a connection's typing state in a room.
    pub fn set_typing(
        &self,
        room_id: i64,
        connection_id: ConnectionId,
        username: &str,
        is_typing: bool,
    ) {
        let mut entries = self.typing.entry(room_id).or_default();
        entries.retain(|(conn, _)| *conn != connection_id);
        if is_typing {
            entries.push((connection_id, username.to_string()));
        }
    }

    /// Distinct usernames currently typing in a room.
    pub fn list_typing(&self, room_id: i64) -> Vec<String> {
        let Some(entries) = self.typing.get(&room_id) else {
            return Vec::new();
        };
        let mut users: Vec<String> = Vec::new();
        for (_, username) in entries.iter() {
            if !users.contains(username) {
                users.push(username.clone());
            }
        }
        users
    }

    /// Remove every typing entry for a connection, returning the rooms
    /// whose typing lists changed so callers can rebroadcast them.
    pub fn purge_typing(&self, connection_id: ConnectionId) -> Vec<i64> {
        let mut affected = Vec::new();
        for mut entry in self.typing.iter_mut() {
            let before = entry.value().len();
            entry.value_mut().retain(|(conn, _)| *conn != connection_id);
            if entry.value().len() != before {
                affected.push(*entry.key());
            }
        }
        affected
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn principal(username: &str) -> Principal {
        Principal {
            username: username.into(),
            display_name: username.into(),
            color: "#abc".into(),
            role: Role::User,
        }
    }

    #[test]
    fn multi_device_presence_counts_once() {
        let presence = PresenceTracker::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        presence.register(first, principal("alice"));
        presence.register(second, principal("alice"));
        assert_eq!(presence.list_online(), vec!["alice".to_string()]);

        presence.unregister(first);
        assert!(presence.is_online("alice"));

        presence.unregister(second);
        assert!(!presence.is_online("alice"));
        assert!(presence.list_online().is_empty());
    }

    #[test]
    fn online_list_is_sorted_and_distinct() {
        let presence = PresenceTracker::new();
        presence.register(Uuid::new_v4(), principal("carol"));
        presence.register(Uuid::new_v4(), principal("alice"));
        presence.register(Uuid::new_v4(), principal("bob"));
        presence.register(Uuid::new_v4(), principal("alice"));

        assert_eq!(
            presence.list_online(),
            vec!["alice".to_string(), "bob".to_string(), "carol".to_string()]
        );
    }

    #[test]
    fn typing_is_tracked_per_room_and_connection() {
        let presence = PresenceTracker::new();
        let desktop = Uuid::new_v4();
        let web = Uuid::new_v4();

        presence.set_typing(1, desktop, "alice", true);
        presence.set_typing(2, web, "alice", true);
        assert_eq!(presence.list_typing(1), vec!["alice".to_string()]);
        assert_eq!(presence.list_typing(2), vec!["alice".to_string()]);

        presence.set_typing(1, desktop, "alice", false);
        assert!(presence.list_typing(1).is_empty());
        assert_eq!(presence.list_typing(2), vec!["alice".to_string()]);
    }

    #[test]
    fn purge_returns_affected_rooms() {
        let presence = PresenceTracker::new();
        let conn = Uuid::new_v4();
        let other = Uuid::new_v4();

        presence.set_typing(1, conn, "alice", true);
        presence.set_typing(2, conn, "alice", true);
        presence.set_typing(2, other, "bob", true);

        let mut affected = presence.purge_typing(conn);
        affected.sort();
        assert_eq!(affected, vec![1, 2]);
        assert!(presence.list_typing(1).is_empty());
        assert_eq!(presence.list_typing(2), vec!["bob".to_string()]);
    }
}
