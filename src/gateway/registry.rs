//! Connection Registry
//!
//! Tracks live connections and their outbound queues, and provides the
//! fan-out primitives the message pipeline broadcasts through. Delivery
//! is an unbounded in-process queue per connection; a closed queue simply
//! drops the event, matching the "disconnect stops future broadcasts"
//! contract.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::events::{ClientType, ConnectionId, ServerEvent};
use crate::domain::Principal;

/// A registered connection with its outbound event queue.
pub struct ConnectedClient {
    pub connection_id: ConnectionId,
    pub principal: Principal,
    pub client: ClientType,
    pub sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Registry of all live connections.
pub struct Gateway {
    /// Active connections by connection id
    connections: DashMap<ConnectionId, Arc<ConnectedClient>>,
    /// Username to connection ids (one user can have multiple devices)
    user_connections: DashMap<String, Vec<ConnectionId>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
        }
    }

    /// Register a new authenticated connection.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        principal: Principal,
        client: ClientType,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let username = principal.username.clone();
        let connected = Arc::new(ConnectedClient {
            connection_id,
            principal,
            client,
            sender,
        });

        self.connections.insert(connection_id, connected);
        self.user_connections
            .entry(username.clone())
            .or_default()
            .push(connection_id);

        tracing::info!(
            username = %username,
            connection_id = %connection_id,
            "Connection registered"
        );
    }

    /// Unregister a connection, returning its principal if it was known.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Principal> {
        let (_, connected) = self.connections.remove(&connection_id)?;

        let username = &connected.principal.username;
        if let Some(mut conns) = self.user_connections.get_mut(username) {
            conns.retain(|c| *c != connection_id);
        }
        self.user_connections
            .remove_if(username, |_, conns| conns.is_empty());

        tracing::info!(
            username = %username,
            connection_id = %connection_id,
            "Connection unregistered"
        );

        Some(connected.principal.clone())
    }

    /// Send an event to a single connection. Returns false if the
    /// connection is gone.
    pub fn send_to_connection(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&connection_id) {
            Some(conn) => conn.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Send an event to every connection of a username (multi-device).
    pub fn send_to_user(&self, username: &str, event: ServerEvent) {
        if let Some(conns) = self.user_connections.get(username) {
            for connection_id in conns.value() {
                if let Some(conn) = self.connections.get(connection_id) {
                    let _ = conn.sender.send(event.clone());
                }
            }
        }
    }

    /// Send an event to a set of connections (a room's broadcast group).
    pub fn send_to_many(&self, targets: &[ConnectionId], event: ServerEvent) {
        for connection_id in targets {
            if let Some(conn) = self.connections.get(connection_id) {
                let _ = conn.sender.send(event.clone());
            }
        }
    }

    /// Send an event to every live connection.
    pub fn broadcast_all(&self, event: ServerEvent) {
        for conn in self.connections.iter() {
            let _ = conn.sender.send(event.clone());
        }
    }

    /// Whether a username has at least one live connection.
    pub fn is_user_online(&self, username: &str) -> bool {
        self.user_connections
            .get(username)
            .map(|conns| !conns.is_empty())
            .unwrap_or(false)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use uuid::Uuid;

    fn principal(username: &str) -> Principal {
        Principal {
            username: username.into(),
            display_name: username.into(),
            color: "#abc".into(),
            role: Role::User,
        }
    }

    fn register(gateway: &Gateway, username: &str) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        gateway.register(id, principal(username), ClientType::Web, tx);
        (id, rx)
    }

    #[tokio::test]
    async fn delivers_to_all_connections_of_a_user() {
        let gateway = Gateway::new();
        let (_, mut rx1) = register(&gateway, "alice");
        let (_, mut rx2) = register(&gateway, "alice");
        let (_, mut rx3) = register(&gateway, "bob");

        gateway.send_to_user(
            "alice",
            ServerEvent::UpdateUserList { users: vec![] },
        );

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_clears_user_mapping() {
        let gateway = Gateway::new();
        let (id1, _rx1) = register(&gateway, "alice");
        let (_id2, _rx2) = register(&gateway, "alice");

        assert!(gateway.is_user_online("alice"));
        gateway.unregister(id1);
        assert!(gateway.is_user_online("alice"));
        assert_eq!(gateway.connection_count(), 1);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_is_false() {
        let gateway = Gateway::new();
        assert!(!gateway.send_to_connection(
            Uuid::new_v4(),
            ServerEvent::UpdateUserList { users: vec![] }
        ));
    }
}
