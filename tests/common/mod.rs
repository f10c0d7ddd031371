//! Common Test Utilities
//!
//! In-memory store implementations and a wired chat core for end-to-end
//! pipeline tests without PostgreSQL or Redis.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use parley_server::application::services::{ChatService, ConnectionContext, ModerationGate};
use parley_server::domain::{
    Ban, Message, MessageEdit, MessageRepository, ModerationRepository, Mute, Notification,
    NotificationRepository, PrivateMessage, PrivateMessageRepository, Principal, Reaction,
    ReactionGroup, ReactionRepository, ReadStateRepository, Role, Room, RoomRepository, RoomType,
    User, UserRepository,
};
use parley_server::gateway::{ClientType, Gateway, PresenceTracker, RoomRouter, ServerEvent};
use parley_server::shared::error::AppError;
use parley_server::shared::snowflake::SnowflakeGenerator;

// --- In-memory stores ---

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUsers {
    pub fn add(&self, username: &str) {
        self.users.lock().insert(
            username.to_string(),
            User {
                username: username.to_string(),
                display_name: None,
                color: "#7a9cc6".to_string(),
                role: Role::User,
                created_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().get(username).cloned())
    }
}

pub struct InMemoryRooms {
    rooms: Vec<Room>,
}

impl InMemoryRooms {
    pub fn new(ids: &[i64]) -> Self {
        let rooms = ids
            .iter()
            .enumerate()
            .map(|(position, id)| Room {
                id: *id,
                server_id: 1,
                name: format!("room-{}", id),
                room_type: RoomType::Text,
                position: position as i32,
            })
            .collect();
        Self { rooms }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRooms {
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>, AppError> {
        Ok(self.rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Room>, AppError> {
        Ok(self.rooms.clone())
    }

    async fn default_room(&self) -> Result<Room, AppError> {
        self.rooms
            .first()
            .cloned()
            .ok_or_else(|| AppError::Internal("No rooms configured".into()))
    }
}

pub struct InMemoryMessages {
    messages: Mutex<Vec<Message>>,
    edits: Mutex<Vec<MessageEdit>>,
    reactions: Arc<InMemoryReactions>,
}

impl InMemoryMessages {
    pub fn new(reactions: Arc<InMemoryReactions>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            reactions,
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.lock().iter().find(|m| m.id == id).cloned())
    }

    async fn recent(&self, room_id: i64, limit: i32) -> Result<Vec<Message>, AppError> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.id);
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        self.messages.lock().push(message.clone());
        Ok(message.clone())
    }

    async fn edit(
        &self,
        message_id: i64,
        new_content: &str,
        edited_by: &str,
    ) -> Result<Message, AppError> {
        let mut messages = self.messages.lock();
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

        let now = Utc::now();
        self.edits.lock().push(MessageEdit {
            message_id,
            original_content: message.content.clone(),
            edited_content: new_content.to_string(),
            edited_by: edited_by.to_string(),
            edited_at: now,
        });
        message.content = new_content.to_string();
        message.edited_at = Some(now);
        Ok(message.clone())
    }

    async fn delete(&self, message_id: i64) -> Result<(), AppError> {
        self.messages.lock().retain(|m| m.id != message_id);
        self.edits.lock().retain(|e| e.message_id != message_id);
        self.reactions
            .reactions
            .lock()
            .retain(|r| r.message_id != message_id);
        Ok(())
    }

    async fn edit_history(&self, message_id: i64) -> Result<Vec<MessageEdit>, AppError> {
        Ok(self
            .edits
            .lock()
            .iter()
            .filter(|e| e.message_id == message_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPrivateMessages {
    pub messages: Mutex<Vec<PrivateMessage>>,
}

#[async_trait]
impl PrivateMessageRepository for InMemoryPrivateMessages {
    async fn create(&self, message: &PrivateMessage) -> Result<PrivateMessage, AppError> {
        self.messages.lock().push(message.clone());
        Ok(message.clone())
    }
}

#[derive(Default)]
pub struct InMemoryReactions {
    reactions: Mutex<Vec<Reaction>>,
}

#[async_trait]
impl ReactionRepository for InMemoryReactions {
    async fn add(&self, message_id: i64, username: &str, emoji: &str) -> Result<(), AppError> {
        let mut reactions = self.reactions.lock();
        let exists = reactions
            .iter()
            .any(|r| r.message_id == message_id && r.username == username && r.emoji == emoji);
        if !exists {
            reactions.push(Reaction {
                message_id,
                username: username.to_string(),
                emoji: emoji.to_string(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn remove(&self, message_id: i64, username: &str, emoji: &str) -> Result<(), AppError> {
        self.reactions
            .lock()
            .retain(|r| !(r.message_id == message_id && r.username == username && r.emoji == emoji));
        Ok(())
    }

    async fn reactions_for(&self, message_id: i64) -> Result<Vec<ReactionGroup>, AppError> {
        let reactions = self.reactions.lock();
        let mut groups: Vec<ReactionGroup> = Vec::new();
        for reaction in reactions.iter().filter(|r| r.message_id == message_id) {
            match groups.iter_mut().find(|g| g.emoji == reaction.emoji) {
                Some(group) => {
                    group.count += 1;
                    group.users.push(reaction.username.clone());
                }
                None => groups.push(ReactionGroup {
                    emoji: reaction.emoji.clone(),
                    count: 1,
                    users: vec![reaction.username.clone()],
                }),
            }
        }
        Ok(groups)
    }
}

#[derive(Default)]
pub struct InMemoryModeration {
    pub mutes: Mutex<Vec<Mute>>,
    pub bans: Mutex<Vec<Ban>>,
    pub blocks: Mutex<Vec<(String, String)>>,
}

impl InMemoryModeration {
    pub fn mute(&self, username: &str) {
        self.mutes.lock().push(Mute {
            username: username.to_string(),
            issued_by: "mod".to_string(),
            reason: "test".to_string(),
            expires_at: Some(Utc::now() + chrono::Duration::minutes(10)),
            created_at: Utc::now(),
        });
    }

    pub fn ban(&self, username: &str) {
        self.bans.lock().push(Ban {
            username: username.to_string(),
            issued_by: "mod".to_string(),
            reason: "test".to_string(),
            expires_at: None,
            created_at: Utc::now(),
        });
    }

    pub fn block(&self, blocker: &str, blocked: &str) {
        self.blocks
            .lock()
            .push((blocker.to_string(), blocked.to_string()));
    }
}

#[async_trait]
impl ModerationRepository for InMemoryModeration {
    async fn active_ban(&self, username: &str) -> Result<Option<Ban>, AppError> {
        let now = Utc::now();
        Ok(self
            .bans
            .lock()
            .iter()
            .find(|b| b.username == username && b.expires_at.map_or(true, |at| at > now))
            .cloned())
    }

    async fn active_mute(&self, username: &str) -> Result<Option<Mute>, AppError> {
        let now = Utc::now();
        Ok(self
            .mutes
            .lock()
            .iter()
            .find(|m| m.username == username && m.expires_at.map_or(true, |at| at > now))
            .cloned())
    }

    async fn is_blocked(&self, blocker: &str, blocked: &str) -> Result<bool, AppError> {
        Ok(self
            .blocks
            .lock()
            .iter()
            .any(|(a, b)| a == blocker && b == blocked))
    }
}

#[derive(Default)]
pub struct InMemoryReadState {
    positions: Mutex<HashMap<(String, i64), i64>>,
}

#[async_trait]
impl ReadStateRepository for InMemoryReadState {
    async fn advance(
        &self,
        username: &str,
        room_id: i64,
        message_id: i64,
    ) -> Result<bool, AppError> {
        let mut positions = self.positions.lock();
        let key = (username.to_string(), room_id);
        match positions.get(&key) {
            Some(current) if *current >= message_id => Ok(false),
            _ => {
                positions.insert(key, message_id);
                Ok(true)
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryNotifications {
    pub created: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationRepository for InMemoryNotifications {
    async fn create(&self, notification: &Notification) -> Result<(), AppError> {
        self.created.lock().push(notification.clone());
        Ok(())
    }
}

// --- Wired chat core ---

/// The full chat core wired against in-memory stores.
pub struct TestCore {
    pub chat: ChatService,
    pub gateway: Arc<Gateway>,
    pub presence: Arc<PresenceTracker>,
    pub router: Arc<RoomRouter>,
    pub users: Arc<InMemoryUsers>,
    pub messages: Arc<InMemoryMessages>,
    pub private_messages: Arc<InMemoryPrivateMessages>,
    pub reactions: Arc<InMemoryReactions>,
    pub moderation: Arc<InMemoryModeration>,
    pub notifications: Arc<InMemoryNotifications>,
}

impl TestCore {
    /// Build a core with the given rooms; the first id is the default room.
    pub fn new(room_ids: &[i64]) -> Self {
        Self::with_history_limit(room_ids, 50)
    }

    /// Build a core with a specific replay limit.
    pub fn with_history_limit(room_ids: &[i64], history_limit: i32) -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let reactions = Arc::new(InMemoryReactions::default());
        let messages = Arc::new(InMemoryMessages::new(reactions.clone()));
        let private_messages = Arc::new(InMemoryPrivateMessages::default());
        let moderation = Arc::new(InMemoryModeration::default());
        let notifications = Arc::new(InMemoryNotifications::default());

        let gateway = Arc::new(Gateway::new());
        let presence = Arc::new(PresenceTracker::new());
        let router = Arc::new(RoomRouter::new());

        let chat = ChatService::new(
            messages.clone(),
            private_messages.clone(),
            reactions.clone(),
            Arc::new(InMemoryRooms::new(room_ids)),
            users.clone(),
            notifications.clone(),
            Arc::new(InMemoryReadState::default()),
            ModerationGate::new(moderation.clone()),
            gateway.clone(),
            router.clone(),
            presence.clone(),
            Arc::new(SnowflakeGenerator::new(1)),
            history_limit,
        );

        Self {
            chat,
            gateway,
            presence,
            router,
            users,
            messages,
            private_messages,
            reactions,
            moderation,
            notifications,
        }
    }

    /// Register a connection for a (created) user and join the default room.
    pub async fn connect(
        &self,
        username: &str,
    ) -> (ConnectionContext, mpsc::UnboundedReceiver<ServerEvent>) {
        self.users.add(username);
        let principal = Principal {
            username: username.to_string(),
            display_name: username.to_string(),
            color: "#7a9cc6".to_string(),
            role: Role::User,
        };

        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.gateway
            .register(connection_id, principal.clone(), ClientType::Web, tx);
        self.presence.register(connection_id, principal.clone());

        let ctx = ConnectionContext {
            connection_id,
            principal,
        };
        self.chat
            .join_default(&ctx)
            .await
            .expect("default room join");
        (ctx, rx)
    }
}
