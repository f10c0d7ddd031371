//! WebSocket Connection Handler
//!
//! Drives a single gateway connection through its lifecycle:
//!
//! 1. Identify handshake with timeout: the first frame must carry a
//!    credential, resolved to a principal before anything else happens.
//! 2. Ban gate: banned users receive a `banned` frame and are closed.
//! 3. Session start: registry + presence registration, user-list
//!    broadcast, room list, default room join with history replay.
//! 4. Event loop: client frames dispatched to the chat service; errors
//!    are reported only to this connection.
//! 5. Disconnect cleanup: typing purge, room leave, deregistration, and
//!    a fresh user-list broadcast.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::application::services::{ChatService, ConnectionContext};
use crate::domain::{Ban, Principal};
use crate::gateway::{
    ClientEvent, ClientType, ConnectionId, Gateway, IdentifyFrame, PresenceTracker, RoomRouter,
    ServerEvent,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Grace period letting a final frame flush before the socket drops.
const CLOSE_FLUSH_DELAY: Duration = Duration::from_millis(100);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual gateway connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id: ConnectionId = Uuid::new_v4();
    tracing::debug!(connection_id = %connection_id, "New gateway connection");

    // Split socket for concurrent read/write
    let (sender, mut receiver) = socket.split();

    // All pushes to this client flow through one channel so event order
    // is preserved regardless of which task produced them
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();
    let sender_task = tokio::spawn(forward_events(rx, sender));

    // Wait for identify (with timeout)
    let identify_timeout = Duration::from_secs(state.settings.websocket.identify_timeout_secs);
    let identify = match timeout(identify_timeout, read_identify(&mut receiver)).await {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            tracing::debug!(connection_id = %connection_id, "Connection closed before identify");
            metrics::record_handshake("rejected");
            sender_task.abort();
            return;
        }
        Err(_) => {
            tracing::debug!(connection_id = %connection_id, "Identify timeout");
            metrics::record_handshake("timeout");
            let _ = tx.send(ServerEvent::Error {
                kind: "unauthenticated".into(),
                message: "Identify timeout".into(),
                expires_at: None,
            });
            tokio::time::sleep(CLOSE_FLUSH_DELAY).await;
            sender_task.abort();
            return;
        }
    };

    // Resolve the credential to a principal
    let principal = match state.resolver.resolve(&identify.credential.into()).await {
        Ok(principal) => principal,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Identify rejected");
            metrics::record_handshake("rejected");
            let _ = tx.send(ServerEvent::from_error(&e));
            tokio::time::sleep(CLOSE_FLUSH_DELAY).await;
            sender_task.abort();
            return;
        }
    };

    let admission = admit_connection(
        &state.chat,
        &state.gateway,
        &state.presence,
        connection_id,
        principal,
        identify.client,
        tx.clone(),
    )
    .await;

    let ctx = match admission {
        Ok(Admission::Accepted(ctx)) => {
            metrics::record_handshake("accepted");
            metrics::set_active_connections(state.gateway.connection_count() as i64);
            ctx
        }
        Ok(Admission::Banned(ban)) => {
            tracing::info!(username = %ban.username, "Banned user rejected at connect");
            metrics::record_handshake("rejected");
            tokio::time::sleep(CLOSE_FLUSH_DELAY).await;
            sender_task.abort();
            return;
        }
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Ban check failed");
            metrics::record_handshake("rejected");
            let _ = tx.send(ServerEvent::from_error(&e));
            tokio::time::sleep(CLOSE_FLUSH_DELAY).await;
            sender_task.abort();
            return;
        }
    };

    tracing::info!(
        username = %ctx.principal.username,
        connection_id = %connection_id,
        "User connected and identified"
    );

    if let Err(e) = send_initial_state(&state, &ctx).await {
        tracing::error!(connection_id = %connection_id, error = %e, "Initial state failed");
        state.gateway.send_to_connection(connection_id, ServerEvent::from_error(&e));
        disconnect(&state.chat, &state.gateway, &state.presence, &state.router, connection_id);
        metrics::set_active_connections(state.gateway.connection_count() as i64);
        sender_task.abort();
        return;
    }

    // Main event loop
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let event = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "Bad frame");
                        state.gateway.send_to_connection(
                            connection_id,
                            ServerEvent::Error {
                                kind: "validation".into(),
                                message: "Unrecognized frame".into(),
                                expires_at: None,
                            },
                        );
                        continue;
                    }
                };

                if let Err(err) = dispatch(&state, &ctx, event).await {
                    tracing::debug!(
                        connection_id = %connection_id,
                        username = %ctx.principal.username,
                        error = %err,
                        "Event rejected"
                    );
                    // Errors only ever go to the connection that caused them
                    let event = match err {
                        AppError::Banned(ref ban) => ServerEvent::Banned { ban: ban.clone() },
                        ref other => ServerEvent::from_error(other),
                    };
                    let fatal = err.is_fatal();
                    state.gateway.send_to_connection(connection_id, event);
                    if fatal {
                        tokio::time::sleep(CLOSE_FLUSH_DELAY).await;
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by axum
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    disconnect(&state.chat, &state.gateway, &state.presence, &state.router, ctx.connection_id);
    metrics::set_active_connections(state.gateway.connection_count() as i64);
    sender_task.abort();

    tracing::info!(
        username = %ctx.principal.username,
        connection_id = %connection_id,
        "User disconnected"
    );
}

/// Forward queued server events onto the socket as JSON text frames.
async fn forward_events(
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    mut sender: SplitSink<WebSocket, Message>,
) {
    while let Some(event) = rx.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize event");
                continue;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}

/// Read frames until a parseable identify arrives. Unparseable frames are
/// skipped rather than fatal; a close frame or stream end yields None.
async fn read_identify(receiver: &mut SplitStream<WebSocket>) -> Option<IdentifyFrame> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(frame) = serde_json::from_str::<IdentifyFrame>(&text) {
                    return Some(frame);
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            _ => continue,
        }
    }
    None
}

/// Room list, default room membership, and history replay for a freshly
/// identified connection.
async fn send_initial_state(state: &AppState, ctx: &ConnectionContext) -> Result<(), AppError> {
    let rooms = state.chat.list_rooms().await?;
    state
        .gateway
        .send_to_connection(ctx.connection_id, ServerEvent::RoomList { rooms });

    let (room, messages) = state.chat.join_default(ctx).await?;
    state.gateway.send_to_connection(
        ctx.connection_id,
        ServerEvent::LoadHistory {
            room_id: room.id,
            messages,
        },
    );
    Ok(())
}

/// Route one client event into the chat service.
async fn dispatch(
    state: &AppState,
    ctx: &ConnectionContext,
    event: ClientEvent,
) -> Result<(), AppError> {
    match event {
        ClientEvent::SwitchRoom { room_id } => {
            let (room, messages) = state.chat.switch_room(ctx, room_id).await?;
            state.gateway.send_to_connection(
                ctx.connection_id,
                ServerEvent::LoadHistory {
                    room_id: room.id,
                    messages,
                },
            );
        }
        ClientEvent::ChatMessage {
            text,
            file_url,
            file_type,
        } => {
            state.chat.post_message(ctx, &text, file_url, file_type).await?;
        }
        ClientEvent::PrivateMessage { to, text } => {
            state.chat.post_private_message(ctx, &to, &text).await?;
        }
        ClientEvent::Typing { is_typing } => {
            state.chat.set_typing(ctx, is_typing);
        }
        ClientEvent::AddReaction { message_id, emoji } => {
            state.chat.add_reaction(ctx, message_id, &emoji).await?;
        }
        ClientEvent::RemoveReaction { message_id, emoji } => {
            state.chat.remove_reaction(ctx, message_id, &emoji).await?;
        }
        ClientEvent::EditMessage { message_id, text } => {
            state.chat.edit_message(ctx, message_id, &text).await?;
        }
        ClientEvent::DeleteMessage { message_id } => {
            state.chat.delete_message(ctx, message_id).await?;
        }
        ClientEvent::MarkRead { message_id } => {
            state.chat.mark_read(ctx, message_id).await?;
        }
    }
    Ok(())
}

/// Outcome of the connect-time admission gate.
pub enum Admission {
    /// Registered with the gateway and presence tracker.
    Accepted(ConnectionContext),
    /// Rejected with a `banned` frame; nothing was registered.
    Banned(Ban),
}

/// Gate a freshly identified connection on its active ban, then register
/// it. A banned user receives the `banned` frame on their own queue and
/// never reaches the registry or the presence tracker; everyone else gets
/// the refreshed user list.
pub async fn admit_connection(
    chat: &ChatService,
    gateway: &Gateway,
    presence: &PresenceTracker,
    connection_id: ConnectionId,
    principal: Principal,
    client: ClientType,
    tx: mpsc::UnboundedSender<ServerEvent>,
) -> Result<Admission, AppError> {
    if let Some(ban) = chat.gate().check_ban(&principal.username).await? {
        let _ = tx.send(ServerEvent::Banned { ban: ban.clone() });
        return Ok(Admission::Banned(ban));
    }

    gateway.register(connection_id, principal.clone(), client, tx);
    presence.register(connection_id, principal.clone());

    // Everyone sees the new arrival
    gateway.broadcast_all(ServerEvent::UpdateUserList {
        users: presence.list_online(),
    });

    Ok(Admission::Accepted(ConnectionContext {
        connection_id,
        principal,
    }))
}

/// Tear down everything the connection registered. Typing indicators are
/// purged first so other members never see a ghost typist.
pub fn disconnect(
    chat: &ChatService,
    gateway: &Gateway,
    presence: &PresenceTracker,
    router: &RoomRouter,
    connection_id: ConnectionId,
) {
    for room_id in presence.purge_typing(connection_id) {
        chat.broadcast_typing(room_id);
    }
    router.leave(connection_id);
    presence.unregister(connection_id);
    gateway.unregister(connection_id);

    gateway.broadcast_all(ServerEvent::UpdateUserList {
        users: presence.list_online(),
    });
}
