//! Message Pipeline
//!
//! Sanitizes, persists, and fans out chat messages, private messages,
//! reactions, edits, deletions, read receipts, and mention notifications.
//!
//! Ordering: within a room, broadcast order matches persistence order.
//! Both happen under a per-room async mutex, so two concurrent posts to
//! the same room can never interleave persist and broadcast. Across rooms
//! there is no ordering guarantee.
//!
//! Failure semantics: all preconditions fail closed and are reported only
//! to the originating connection; store errors are logged and surfaced as
//! a generic failure without retry.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::moderation::ModerationGate;
use crate::domain::{
    Message, MessageRepository, Notification, NotificationRepository, PrivateMessage,
    PrivateMessageRepository, Principal, ReactionRepository, ReadStateRepository, Room,
    RoomRepository, UserRepository,
};
use crate::gateway::{ConnectionId, Gateway, PresenceTracker, RoomRouter, ServerEvent};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::text;

/// Maximum characters of message content carried in a mention notification.
const NOTIFICATION_EXCERPT_LEN: usize = 140;

/// Identity of the connection driving a pipeline operation.
///
/// The principal is resolved once at handshake time and immutable for the
/// connection's lifetime.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    pub principal: Principal,
}

/// The message pipeline and room-switch orchestration.
pub struct ChatService {
    messages: Arc<dyn MessageRepository>,
    private_messages: Arc<dyn PrivateMessageRepository>,
    reactions: Arc<dyn ReactionRepository>,
    rooms: Arc<dyn RoomRepository>,
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    read_state: Arc<dyn ReadStateRepository>,
    gate: ModerationGate,
    gateway: Arc<Gateway>,
    router: Arc<RoomRouter>,
    presence: Arc<PresenceTracker>,
    snowflake: Arc<SnowflakeGenerator>,
    history_limit: i32,
    /// Serializes persist+broadcast per room so fan-out order matches
    /// persistence order.
    room_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl ChatService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        private_messages: Arc<dyn PrivateMessageRepository>,
        reactions: Arc<dyn ReactionRepository>,
        rooms: Arc<dyn RoomRepository>,
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        read_state: Arc<dyn ReadStateRepository>,
        gate: ModerationGate,
        gateway: Arc<Gateway>,
        router: Arc<RoomRouter>,
        presence: Arc<PresenceTracker>,
        snowflake: Arc<SnowflakeGenerator>,
        history_limit: i32,
    ) -> Self {
        Self {
            messages,
            private_messages,
            reactions,
            rooms,
            users,
            notifications,
            read_state,
            gate,
            gateway,
            router,
            presence,
            snowflake,
            history_limit,
            room_locks: DashMap::new(),
        }
    }

    pub fn gate(&self) -> &ModerationGate {
        &self.gate
    }

    fn room_lock(&self, room_id: i64) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Join the default room and return it with its replay history.
    pub async fn join_default(
        &self,
        ctx: &ConnectionContext,
    ) -> Result<(Room, Vec<Message>), AppError> {
        let room = self.rooms.default_room().await?;
        self.enter_room(ctx, room).await
    }

    /// Switch the connection to another room and return its replay history.
    pub async fn switch_room(
        &self,
        ctx: &ConnectionContext,
        room_id: i64,
    ) -> Result<(Room, Vec<Message>), AppError> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?;
        self.enter_room(ctx, room).await
    }

    async fn enter_room(
        &self,
        ctx: &ConnectionContext,
        room: Room,
    ) -> Result<(Room, Vec<Message>), AppError> {
        // Membership change and history fetch happen under the room's
        // ordering lock: no message can be persisted and broadcast between
        // the switch and the fetch, so replay and live delivery never
        // overlap for this connection.
        let lock = self.room_lock(room.id);
        let _ordering = lock.lock().await;

        let previous = self.router.switch(ctx.connection_id, room.id);

        // Leaving a room ends any typing indicator there
        if let Some(old_room) = previous.filter(|old| *old != room.id) {
            self.presence
                .set_typing(old_room, ctx.connection_id, &ctx.principal.username, false);
            self.broadcast_typing(old_room);
        }

        // Most recent messages, oldest first: clients render top-to-bottom
        let history = self.messages.recent(room.id, self.history_limit).await?;
        Ok((room, history))
    }

    /// All rooms for sidebar rendering.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        self.rooms.list().await
    }

    /// Post a chat message to the connection's current room.
    pub async fn post_message(
        &self,
        ctx: &ConnectionContext,
        text: &str,
        file_url: Option<String>,
        file_type: Option<String>,
    ) -> Result<Message, AppError> {
        let room_id = self
            .router
            .current_room(ctx.connection_id)
            .ok_or_else(|| AppError::Validation("Connection has not joined a room".into()))?;

        let username = &ctx.principal.username;
        self.gate.ensure_not_banned(username).await?;
        self.gate.ensure_can_send(username).await?;

        // A file-only message may have empty text
        let trimmed = if file_url.is_some() && text.trim().is_empty() {
            ""
        } else {
            text::validate_content(text).map_err(AppError::Validation)?
        };
        let content = text::escape_html(trimmed);
        let mentions = text::extract_mentions(&content);

        let message = Message {
            id: self.snowflake.generate(),
            room_id,
            author: username.clone(),
            color: ctx.principal.color.clone(),
            content,
            file_url,
            file_type,
            mentions,
            edited_at: None,
            created_at: Utc::now(),
        };

        let message = {
            let lock = self.room_lock(room_id);
            let _ordering = lock.lock().await;
            let message = self.messages.create(&message).await?;
            self.gateway
                .send_to_many(&self.router.members(room_id), ServerEvent::ChatMessage(message.clone()));
            message
        };

        metrics::record_message("chat");
        self.spawn_mention_notifications(&message);
        Ok(message)
    }

    /// Mention delivery is best-effort: run it off the hot path and never
    /// let it fail the primary broadcast.
    fn spawn_mention_notifications(&self, message: &Message) {
        if message.mentions.is_empty() {
            return;
        }
        let users = Arc::clone(&self.users);
        let notifications = Arc::clone(&self.notifications);
        let gateway = Arc::clone(&self.gateway);
        let snowflake = Arc::clone(&self.snowflake);
        let message = message.clone();
        tokio::spawn(async move {
            deliver_mentions(users, notifications, gateway, snowflake, message).await;
        });
    }

    /// Send a private message to a username, delivering to all of the
    /// recipient's connections and echoing an ack to the sender.
    pub async fn post_private_message(
        &self,
        ctx: &ConnectionContext,
        to_username: &str,
        text: &str,
    ) -> Result<PrivateMessage, AppError> {
        let from = &ctx.principal.username;
        self.gate.ensure_can_send(from).await?;

        let recipient = self
            .users
            .find_by_username(to_username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", to_username)))?;

        self.gate.ensure_unblocked(from, &recipient.username).await?;

        let trimmed = text::validate_content(text).map_err(AppError::Validation)?;
        let message = PrivateMessage {
            id: self.snowflake.generate(),
            from_user: from.clone(),
            to_user: recipient.username.clone(),
            content: text::escape_html(trimmed),
            created_at: Utc::now(),
        };

        let message = self.private_messages.create(&message).await?;

        self.gateway
            .send_to_user(&message.to_user, ServerEvent::PrivateMessage(message.clone()));
        self.gateway.send_to_connection(
            ctx.connection_id,
            ServerEvent::PrivateMessageSent(message.clone()),
        );

        metrics::record_message("private");
        Ok(message)
    }

    /// Edit a message. Author or admin only; the edit-history row and the
    /// live-row mutation are one atomic unit in the store.
    pub async fn edit_message(
        &self,
        ctx: &ConnectionContext,
        message_id: i64,
        new_text: &str,
    ) -> Result<Message, AppError> {
        let message = self.find_message(message_id).await?;
        self.ensure_owner_or_admin(ctx, &message.author, "edit")?;

        let trimmed = text::validate_content(new_text).map_err(AppError::Validation)?;
        let content = text::escape_html(trimmed);
        if content == message.content {
            return Err(AppError::Validation(
                "Edited text is identical to the current text".into(),
            ));
        }

        let updated = self
            .messages
            .edit(message_id, &content, &ctx.principal.username)
            .await?;

        self.gateway.send_to_many(
            &self.router.members(updated.room_id),
            ServerEvent::MessageEdited(updated.clone()),
        );
        Ok(updated)
    }

    /// Delete a message. Author or admin only; reactions and edit history
    /// are cascade-deleted, then a tombstone is broadcast.
    pub async fn delete_message(
        &self,
        ctx: &ConnectionContext,
        message_id: i64,
    ) -> Result<(), AppError> {
        let message = self.find_message(message_id).await?;
        self.ensure_owner_or_admin(ctx, &message.author, "delete")?;

        self.messages.delete(message_id).await?;

        self.gateway.send_to_many(
            &self.router.members(message.room_id),
            ServerEvent::MessageDeleted {
                message_id,
                room_id: message.room_id,
            },
        );
        Ok(())
    }

    /// Idempotent reaction toggle; always rebroadcasts the full reaction
    /// list so clients never track deltas.
    pub async fn add_reaction(
        &self,
        ctx: &ConnectionContext,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), AppError> {
        if emoji.trim().is_empty() {
            return Err(AppError::Validation("Emoji must not be empty".into()));
        }
        let message = self.find_message(message_id).await?;
        self.reactions
            .add(message_id, &ctx.principal.username, emoji)
            .await?;
        self.broadcast_reactions(message.room_id, message_id).await
    }

    /// Remove a reaction; removing a non-existent reaction is a no-op.
    pub async fn remove_reaction(
        &self,
        ctx: &ConnectionContext,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), AppError> {
        let message = self.find_message(message_id).await?;
        self.reactions
            .remove(message_id, &ctx.principal.username, emoji)
            .await?;
        self.broadcast_reactions(message.room_id, message_id).await
    }

    async fn broadcast_reactions(&self, room_id: i64, message_id: i64) -> Result<(), AppError> {
        let reactions = self.reactions.reactions_for(message_id).await?;
        self.gateway.send_to_many(
            &self.router.members(room_id),
            ServerEvent::ReactionUpdate {
                message_id,
                reactions,
            },
        );
        Ok(())
    }

    /// Advance the caller's read position in the current room. Regressions
    /// are a silent no-op; only an actual advance is broadcast.
    pub async fn mark_read(
        &self,
        ctx: &ConnectionContext,
        message_id: i64,
    ) -> Result<(), AppError> {
        let room_id = self
            .router
            .current_room(ctx.connection_id)
            .ok_or_else(|| AppError::Validation("Connection has not joined a room".into()))?;

        let advanced = self
            .read_state
            .advance(&ctx.principal.username, room_id, message_id)
            .await?;

        if advanced {
            self.gateway.send_to_many(
                &self.router.members(room_id),
                ServerEvent::ReadReceiptUpdate {
                    room_id,
                    username: ctx.principal.username.clone(),
                    message_id,
                },
            );
        }
        Ok(())
    }

    /// Update the caller's typing state in the current room and broadcast
    /// the room's typing list. Best-effort: not part of the durable log.
    pub fn set_typing(&self, ctx: &ConnectionContext, is_typing: bool) {
        let Some(room_id) = self.router.current_room(ctx.connection_id) else {
            return;
        };
        self.presence.set_typing(
            room_id,
            ctx.connection_id,
            &ctx.principal.username,
            is_typing,
        );
        self.broadcast_typing(room_id);
    }

    /// Broadcast a room's current typing list to its members.
    pub fn broadcast_typing(&self, room_id: i64) {
        self.gateway.send_to_many(
            &self.router.members(room_id),
            ServerEvent::TypingUsers {
                room_id,
                users: self.presence.list_typing(room_id),
            },
        );
    }

    async fn find_message(&self, message_id: i64) -> Result<Message, AppError> {
        self.messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
    }

    fn ensure_owner_or_admin(
        &self,
        ctx: &ConnectionContext,
        author: &str,
        action: &str,
    ) -> Result<(), AppError> {
        if ctx.principal.username == author || ctx.principal.is_admin() {
            return Ok(());
        }
        Err(AppError::PermissionDenied(format!(
            "Only the author or an admin may {} this message",
            action
        )))
    }
}

/// Create and push mention notifications for every distinct mentioned
/// username other than the author. Unknown usernames are skipped; store
/// failures are logged and never propagate.
async fn deliver_mentions(
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    gateway: Arc<Gateway>,
    snowflake: Arc<SnowflakeGenerator>,
    message: Message,
) {
    let excerpt: String = message.content.chars().take(NOTIFICATION_EXCERPT_LEN).collect();

    for mentioned in message.mentions.iter().filter(|m| **m != message.author) {
        let user = match users.find_by_username(mentioned).await {
            Ok(Some(user)) => user,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(mentioned = %mentioned, error = %e, "Mention lookup failed");
                continue;
            }
        };

        let notification = Notification {
            id: snowflake.generate(),
            username: user.username.clone(),
            kind: "mention".into(),
            from_user: message.author.clone(),
            room_id: message.room_id,
            message_id: message.id,
            body: excerpt.clone(),
            read: false,
            created_at: Utc::now(),
        };

        if let Err(e) = notifications.create(&notification).await {
            tracing::warn!(mentioned = %mentioned, error = %e, "Mention notification not persisted");
            continue;
        }

        gateway.send_to_user(
            &user.username,
            ServerEvent::Notification {
                kind: notification.kind,
                from: notification.from_user,
                room_id: notification.room_id,
                message_id: notification.message_id,
                message: notification.body,
            },
        );
    }
}
