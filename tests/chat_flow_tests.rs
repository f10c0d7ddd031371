//! Chat Pipeline Integration Tests
//!
//! End-to-end flows through the chat core wired against in-memory stores:
//! connection admission and teardown, fan-out scope, mentions, moderation,
//! reactions, edits, deletions, and read receipts.

mod common;

use std::time::Duration;

use common::TestCore;
use parley_server::domain::{MessageRepository, Principal, ReactionRepository, Role};
use parley_server::gateway::{ClientType, ServerEvent};
use parley_server::presentation::websocket::{admit_connection, disconnect, Admission};
use parley_server::shared::error::AppError;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;
use uuid::Uuid;

async fn next_event(rx: &mut UnboundedReceiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

fn principal(username: &str) -> Principal {
    Principal {
        username: username.to_string(),
        display_name: username.to_string(),
        color: "#7a9cc6".to_string(),
        role: Role::User,
    }
}

#[tokio::test]
async fn banned_user_is_rejected_at_connect_before_any_registration() {
    let core = TestCore::new(&[1]);
    core.users.add("mallory");
    core.moderation.ban("mallory");

    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let admission = admit_connection(
        &core.chat,
        &core.gateway,
        &core.presence,
        connection_id,
        principal("mallory"),
        ClientType::Web,
        tx,
    )
    .await
    .unwrap();

    match admission {
        Admission::Banned(ban) => assert_eq!(ban.username, "mallory"),
        Admission::Accepted(_) => panic!("banned user was admitted"),
    }

    // The rejection frame is the only thing the connection ever receives
    match next_event(&mut rx).await {
        ServerEvent::Banned { ban } => assert_eq!(ban.username, "mallory"),
        other => panic!("expected banned frame, got {:?}", other),
    }

    assert!(!core.gateway.is_user_online("mallory"));
    assert!(core.presence.list_online().is_empty());
    assert!(core.router.current_room(connection_id).is_none());
}

#[tokio::test]
async fn admitted_connection_is_registered_and_announced() {
    let core = TestCore::new(&[1]);
    let (_alice, mut alice_rx) = core.connect("alice").await;

    core.users.add("bob");
    let connection_id = Uuid::new_v4();
    let (tx, _bob_rx) = mpsc::unbounded_channel();
    let admission = admit_connection(
        &core.chat,
        &core.gateway,
        &core.presence,
        connection_id,
        principal("bob"),
        ClientType::Web,
        tx,
    )
    .await
    .unwrap();

    let ctx = match admission {
        Admission::Accepted(ctx) => ctx,
        Admission::Banned(ban) => panic!("unexpected ban: {:?}", ban),
    };
    assert_eq!(ctx.connection_id, connection_id);
    assert!(core.gateway.is_user_online("bob"));

    match next_event(&mut alice_rx).await {
        ServerEvent::UpdateUserList { mut users } => {
            users.sort();
            assert_eq!(users, ["alice", "bob"]);
        }
        other => panic!("expected user list, got {:?}", other),
    }
}

#[tokio::test]
async fn disconnect_purges_typing_and_refreshes_the_user_list() {
    let core = TestCore::new(&[1]);
    let (_alice, mut alice_rx) = core.connect("alice").await;
    let (bob, _bob_rx) = core.connect("bob").await;

    core.chat.set_typing(&bob, true);
    match next_event(&mut alice_rx).await {
        ServerEvent::TypingUsers { users, .. } => assert_eq!(users, ["bob"]),
        other => panic!("expected typing list, got {:?}", other),
    }

    disconnect(
        &core.chat,
        &core.gateway,
        &core.presence,
        &core.router,
        bob.connection_id,
    );

    // Ghost typist cleared first, then the user list refresh
    match next_event(&mut alice_rx).await {
        ServerEvent::TypingUsers { room_id, users } => {
            assert_eq!(room_id, 1);
            assert!(users.is_empty());
        }
        other => panic!("expected typing list, got {:?}", other),
    }
    match next_event(&mut alice_rx).await {
        ServerEvent::UpdateUserList { users } => assert_eq!(users, ["alice"]),
        other => panic!("expected user list, got {:?}", other),
    }

    assert!(!core.gateway.is_user_online("bob"));
    assert!(!core.router.members(1).contains(&bob.connection_id));
}

#[tokio::test]
async fn history_replay_is_capped_at_the_configured_limit() {
    let core = TestCore::with_history_limit(&[1], 3);
    let (alice, _alice_rx) = core.connect("alice").await;

    for text in ["m1", "m2", "m3", "m4", "m5"] {
        core.chat
            .post_message(&alice, text, None, None)
            .await
            .unwrap();
    }

    let (bob, _bob_rx) = core.connect("bob").await;
    let (_room, history) = core.chat.join_default(&bob).await.unwrap();
    let texts: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, ["m3", "m4", "m5"]);
}

#[tokio::test]
async fn mention_reaches_room_members_and_notifies_target() {
    let core = TestCore::new(&[1]);
    let (alice, mut alice_rx) = core.connect("alice").await;
    let (_bob, mut bob_rx) = core.connect("bob").await;

    core.chat
        .post_message(&alice, "hi @bob", None, None)
        .await
        .unwrap();

    for rx in [&mut alice_rx, &mut bob_rx] {
        match next_event(rx).await {
            ServerEvent::ChatMessage(message) => {
                assert_eq!(message.content, "hi @bob");
                assert_eq!(message.author, "alice");
                assert_eq!(message.mentions, vec!["bob".to_string()]);
            }
            other => panic!("expected chat message, got {:?}", other),
        }
    }

    // Notification delivery runs off the hot path; wait for it
    match next_event(&mut bob_rx).await {
        ServerEvent::Notification {
            kind,
            from,
            room_id,
            ..
        } => {
            assert_eq!(kind, "mention");
            assert_eq!(from, "alice");
            assert_eq!(room_id, 1);
        }
        other => panic!("expected notification, got {:?}", other),
    }

    let persisted = core.notifications.created.lock().clone();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].username, "bob");
}

#[tokio::test]
async fn history_replay_is_oldest_first_and_includes_new_messages() {
    let core = TestCore::new(&[1]);
    let (alice, _rx) = core.connect("alice").await;

    let first = core
        .chat
        .post_message(&alice, "first", None, None)
        .await
        .unwrap();
    let second = core
        .chat
        .post_message(&alice, "second", None, None)
        .await
        .unwrap();
    assert!(second.id > first.id);

    let (carol, _carol_rx) = core.connect("carol").await;
    let (room, history) = core.chat.join_default(&carol).await.unwrap();
    assert_eq!(room.id, 1);
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn messages_stay_scoped_to_their_room() {
    let core = TestCore::new(&[1, 2]);
    let (alice, _alice_rx) = core.connect("alice").await;
    let (dave, mut dave_rx) = core.connect("dave").await;

    core.chat.switch_room(&dave, 2).await.unwrap();

    core.chat
        .post_message(&alice, "room one only", None, None)
        .await
        .unwrap();

    assert!(dave_rx.try_recv().is_err());
}

#[tokio::test]
async fn muted_user_cannot_post() {
    let core = TestCore::new(&[1]);
    let (alice, _rx) = core.connect("alice").await;
    core.moderation.mute("alice");

    let err = core
        .chat
        .post_message(&alice, "should not land", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Muted(_)));
    assert!(!err.is_fatal());

    let (_room, history) = core.chat.join_default(&alice).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn ban_applied_mid_session_is_fatal_at_send_time() {
    let core = TestCore::new(&[1]);
    let (alice, _rx) = core.connect("alice").await;
    core.moderation.ban("alice");

    let err = core
        .chat
        .post_message(&alice, "hi", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Banned(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn blocked_pair_cannot_exchange_private_messages() {
    let core = TestCore::new(&[1]);
    let (alice, _arx) = core.connect("alice").await;
    let (bob, _brx) = core.connect("bob").await;
    core.moderation.block("alice", "bob");

    for (from, to) in [(&alice, "bob"), (&bob, "alice")] {
        let err = core
            .chat
            .post_private_message(from, to, "psst")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Blocked));
    }
    assert!(core.private_messages.messages.lock().is_empty());
}

#[tokio::test]
async fn private_message_reaches_all_recipient_devices() {
    let core = TestCore::new(&[1]);
    let (alice, mut alice_rx) = core.connect("alice").await;
    let (_bob_web, mut bob_web_rx) = core.connect("bob").await;
    let (_bob_desktop, mut bob_desktop_rx) = core.connect("bob").await;

    core.chat
        .post_private_message(&alice, "bob", "psst")
        .await
        .unwrap();

    for rx in [&mut bob_web_rx, &mut bob_desktop_rx] {
        match next_event(rx).await {
            ServerEvent::PrivateMessage(pm) => {
                assert_eq!(pm.from_user, "alice");
                assert_eq!(pm.content, "psst");
            }
            other => panic!("expected private message, got {:?}", other),
        }
    }
    assert!(matches!(
        next_event(&mut alice_rx).await,
        ServerEvent::PrivateMessageSent(_)
    ));
}

#[tokio::test]
async fn duplicate_reactions_collapse() {
    let core = TestCore::new(&[1]);
    let (alice, mut alice_rx) = core.connect("alice").await;
    let (bob, _bob_rx) = core.connect("bob").await;

    let message = core
        .chat
        .post_message(&alice, "react to me", None, None)
        .await
        .unwrap();
    let _ = next_event(&mut alice_rx).await; // own chat message

    core.chat
        .add_reaction(&bob, message.id, "thumbsup")
        .await
        .unwrap();
    core.chat
        .add_reaction(&bob, message.id, "thumbsup")
        .await
        .unwrap();

    // Both mutations rebroadcast, but the count never exceeds one
    for _ in 0..2 {
        match next_event(&mut alice_rx).await {
            ServerEvent::ReactionUpdate { reactions, .. } => {
                assert_eq!(reactions.len(), 1);
                assert_eq!(reactions[0].count, 1);
                assert_eq!(reactions[0].users, vec!["bob".to_string()]);
            }
            other => panic!("expected reaction update, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn edits_broadcast_and_record_history() {
    let core = TestCore::new(&[1]);
    let (alice, mut alice_rx) = core.connect("alice").await;
    let (_bob, mut bob_rx) = core.connect("bob").await;

    let message = core
        .chat
        .post_message(&alice, "draft", None, None)
        .await
        .unwrap();
    let _ = next_event(&mut alice_rx).await;
    let _ = next_event(&mut bob_rx).await;

    core.chat
        .edit_message(&alice, message.id, "final")
        .await
        .unwrap();

    match next_event(&mut bob_rx).await {
        ServerEvent::MessageEdited(edited) => {
            assert_eq!(edited.id, message.id);
            assert_eq!(edited.content, "final");
            assert!(edited.edited_at.is_some());
        }
        other => panic!("expected edited event, got {:?}", other),
    }

    let history = core.messages.edit_history(message.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].original_content, "draft");
    assert_eq!(history[0].edited_content, "final");
}

#[tokio::test]
async fn delete_cascades_reactions_and_broadcasts_tombstone() {
    let core = TestCore::new(&[1]);
    let (alice, _alice_rx) = core.connect("alice").await;
    let (bob, mut bob_rx) = core.connect("bob").await;

    let message = core
        .chat
        .post_message(&alice, "temporary", None, None)
        .await
        .unwrap();
    core.chat
        .add_reaction(&bob, message.id, "eyes")
        .await
        .unwrap();

    core.chat.delete_message(&alice, message.id).await.unwrap();

    // chat message, reaction update, then the tombstone
    let _ = next_event(&mut bob_rx).await;
    let _ = next_event(&mut bob_rx).await;
    match next_event(&mut bob_rx).await {
        ServerEvent::MessageDeleted {
            message_id,
            room_id,
        } => {
            assert_eq!(message_id, message.id);
            assert_eq!(room_id, 1);
        }
        other => panic!("expected tombstone, got {:?}", other),
    }

    assert!(core
        .reactions
        .reactions_for(message.id)
        .await
        .unwrap()
        .is_empty());
    assert!(core.messages.find_by_id(message.id).await.unwrap().is_none());
}

#[tokio::test]
async fn read_positions_never_regress() {
    let core = TestCore::new(&[1]);
    let (alice, mut alice_rx) = core.connect("alice").await;
    let (bob, _bob_rx) = core.connect("bob").await;

    let first = core
        .chat
        .post_message(&alice, "one", None, None)
        .await
        .unwrap();
    let second = core
        .chat
        .post_message(&alice, "two", None, None)
        .await
        .unwrap();
    let _ = next_event(&mut alice_rx).await;
    let _ = next_event(&mut alice_rx).await;

    core.chat.mark_read(&bob, second.id).await.unwrap();
    match next_event(&mut alice_rx).await {
        ServerEvent::ReadReceiptUpdate {
            username,
            message_id,
            ..
        } => {
            assert_eq!(username, "bob");
            assert_eq!(message_id, second.id);
        }
        other => panic!("expected read receipt, got {:?}", other),
    }

    // Stale clients re-reporting an older message are ignored
    core.chat.mark_read(&bob, first.id).await.unwrap();
    assert!(alice_rx.try_recv().is_err());
}

#[tokio::test]
async fn typing_indicator_broadcasts_current_list() {
    let core = TestCore::new(&[1]);
    let (alice, _alice_rx) = core.connect("alice").await;
    let (_bob, mut bob_rx) = core.connect("bob").await;

    core.chat.set_typing(&alice, true);
    match next_event(&mut bob_rx).await {
        ServerEvent::TypingUsers { room_id, users } => {
            assert_eq!(room_id, 1);
            assert_eq!(users, vec!["alice".to_string()]);
        }
        other => panic!("expected typing users, got {:?}", other),
    }

    core.chat.set_typing(&alice, false);
    match next_event(&mut bob_rx).await {
        ServerEvent::TypingUsers { users, .. } => assert!(users.is_empty()),
        other => panic!("expected typing users, got {:?}", other),
    }
}

#[tokio::test]
async fn markup_is_escaped_before_persist_and_fanout() {
    let core = TestCore::new(&[1]);
    let (alice, _rx) = core.connect("alice").await;

    let message = core
        .chat
        .post_message(&alice, "<script>alert(1)</script>", None, None)
        .await
        .unwrap();
    assert_eq!(message.content, "&lt;script&gt;alert(1)&lt;/script&gt;");

    let stored = core
        .messages
        .find_by_id(message.id)
        .await
        .unwrap()
        .expect("message persisted");
    assert_eq!(stored.content, message.content);
}
