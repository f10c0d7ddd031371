//! Wire Event Taxonomy
//!
//! JSON event formats exchanged with clients. Every frame is an object
//! `{"t": <event name>, "d": <payload>}` in both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Ban, Message, PrivateMessage, ReactionGroup, Room};

/// Ephemeral identifier for a live connection. Never persisted.
pub type ConnectionId = Uuid;

/// Client type tag sent during identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    #[default]
    Web,
    Desktop,
    Api,
}

/// Credential presented during the identify handshake.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum WireCredential {
    /// Cookie-backed session id (web clients)
    Session(String),
    /// Self-contained signed token (desktop/API clients)
    Token(String),
}

/// The first frame a client must send after connecting.
#[derive(Debug, Deserialize)]
pub struct IdentifyFrame {
    pub credential: WireCredential,
    #[serde(default)]
    pub client: ClientType,
}

/// Events received from clients after identify.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "t", content = "d", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Leave the current room and join another
    #[serde(rename_all = "camelCase")]
    SwitchRoom { room_id: i64 },

    /// Send a chat message to the current room
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        text: String,
        #[serde(default)]
        file_url: Option<String>,
        #[serde(default)]
        file_type: Option<String>,
    },

    /// Send a private message to a username
    PrivateMessage { to: String, text: String },

    /// Start or stop typing in the current room
    #[serde(rename_all = "camelCase")]
    Typing { is_typing: bool },

    /// Add a reaction to a message
    #[serde(rename_all = "camelCase")]
    AddReaction { message_id: i64, emoji: String },

    /// Remove a reaction from a message
    #[serde(rename_all = "camelCase")]
    RemoveReaction { message_id: i64, emoji: String },

    /// Edit a message (author or admin)
    #[serde(rename_all = "camelCase")]
    EditMessage { message_id: i64, text: String },

    /// Delete a message (author or admin)
    #[serde(rename_all = "camelCase")]
    DeleteMessage { message_id: i64 },

    /// Mark a message as read in the current room
    #[serde(rename_all = "camelCase")]
    MarkRead { message_id: i64 },
}

/// Events pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", content = "d", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full room list, sent after identify
    RoomList { rooms: Vec<Room> },

    /// History replay after a join/switch, oldest first
    #[serde(rename_all = "camelCase")]
    LoadHistory { room_id: i64, messages: Vec<Message> },

    /// A chat message in the connection's current room
    ChatMessage(Message),

    /// An inbound private message
    PrivateMessage(PrivateMessage),

    /// Echo of a private message back to its sender
    PrivateMessageSent(PrivateMessage),

    /// A message in the current room was edited
    MessageEdited(Message),

    /// Global online-user list (recomputed on every connect/disconnect)
    UpdateUserList { users: Vec<String> },

    /// Typing indicator state for a room
    #[serde(rename_all = "camelCase")]
    TypingUsers { room_id: i64, users: Vec<String> },

    /// Full reaction list for a message after a mutation
    #[serde(rename_all = "camelCase")]
    ReactionUpdate {
        message_id: i64,
        reactions: Vec<ReactionGroup>,
    },

    /// Tombstone: remove a message from view without a history reload
    #[serde(rename_all = "camelCase")]
    MessageDeleted { message_id: i64, room_id: i64 },

    /// A user's read position in a room advanced
    #[serde(rename_all = "camelCase")]
    ReadReceiptUpdate {
        room_id: i64,
        username: String,
        message_id: i64,
    },

    /// A targeted notification (currently mentions)
    #[serde(rename_all = "camelCase")]
    Notification {
        kind: String,
        from: String,
        room_id: i64,
        message_id: i64,
        message: String,
    },

    /// Structured error scoped to the originating connection
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(rename = "type")]
        kind: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expires_at: Option<DateTime<Utc>>,
    },

    /// Connection rejection payload sent before a forced disconnect
    Banned { ban: Ban },
}

impl ServerEvent {
    /// Build an error event from an application error.
    pub fn from_error(err: &crate::shared::error::AppError) -> Self {
        use crate::shared::error::AppError;
        let expires_at = match err {
            AppError::Muted(mute) => mute.expires_at,
            _ => None,
        };
        ServerEvent::Error {
            kind: err.kind().to_string(),
            message: err.client_message(),
            expires_at,
        }
    }
}
