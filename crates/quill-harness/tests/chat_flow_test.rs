//! End-to-end chat flows through the production runtime.
//!
//! Each test wires real runtimes to the in-memory backend and scripts them
//! through their driver handles. Scripts own the handles, so when a script
//! finishes (or fails) every runtime sees its driver close and exits.
//!
//! # Oracle Pattern
//!
//! Tests end with checks on both sides of the wire:
//! - rendered App state of each participant
//! - what the backend actually stored

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "Test helpers")]

use quill_app::{
    App, ChatConfig, MessageBody, PLAINTEXT_NOTICE, ReplyPreview, ScrollTarget, UserCommand,
};
use quill_client::{ConnectionState, HubFrame};
use quill_core::{Environment, FileUpload, KeySource, MemoryKeyStore, seal_legacy};
use quill_crypto::KeyPair;
use quill_harness::{SimBackend, SimDriverError, SimEnv, sim_client};
use quill_proto::{ChatMessage, Identity, MessageContent};

type ScriptResult = Result<(), SimDriverError>;

fn enrolled(backend: &SimBackend, name: &str, seed: u8) -> (Identity, KeyPair) {
    let identity = backend.add_user(name);
    let key_pair = KeyPair::generate(SimEnv::with_seed(u64::from(seed)).random_array());
    backend.enroll(&identity, &key_pair);
    (identity, key_pair)
}

fn text(body: &str) -> MessageBody {
    MessageBody::Text(body.to_string())
}

fn ready(app: &App) -> bool {
    app.is_loaded() && app.connection_state().is_connected()
}

fn first_body(app: &App) -> Option<MessageBody> {
    app.conversation().first().map(|m| m.body.clone())
}

#[tokio::test]
async fn encrypted_exchange_between_enrolled_admins() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let (bob, _) = enrolled(&backend, "bob", 2);

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);
    let (bob_rt, mut bob_ui) =
        sim_client(&backend, ChatConfig::new(bob.clone()), MemoryKeyStore::new(), 20);

    let store = backend.clone();
    let script = async move {
        let alice_view = alice_ui.until(ready).await?;
        assert_eq!(alice_view.key_source(), Some(KeySource::Remote));
        bob_ui.until(ready).await?;

        alice_ui.send(UserCommand::SelectPeer(bob.clone()))?;
        alice_ui.send(UserCommand::Send("Front page goes live at 5".into()))?;

        bob_ui.until(|app| app.unread(&alice) == 1).await?;

        let stored = store.conversation(&alice, &bob);
        assert_eq!(stored.len(), 1);
        let content = MessageContent::classify(&stored[0].content);
        assert!(matches!(content, MessageContent::Envelope(_)));
        assert!(!stored[0].content.contains("Front page"));

        bob_ui.send(UserCommand::SelectPeer(alice.clone()))?;
        let bob_view = bob_ui
            .until(|app| first_body(app) == Some(text("Front page goes live at 5")))
            .await?;
        assert_eq!(bob_view.unread(&alice), 0);

        // Sender reads its own message through the self-wrapped key, and sees
        // the read receipt.
        alice_ui
            .until(|app| {
                app.conversation().first().is_some_and(|m| {
                    m.outgoing && m.message.is_read && m.body == text("Front page goes live at 5")
                })
            })
            .await?;
        assert!(store.conversation(&alice, &bob)[0].is_read);
        ScriptResult::Ok(())
    };

    let (alice_result, bob_result, script_result) =
        tokio::join!(alice_rt.run(), bob_rt.run(), script);
    script_result.unwrap();
    alice_result.unwrap();
    bob_result.unwrap();
}

#[tokio::test]
async fn unread_count_drops_to_zero_on_open() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let (bob, _) = enrolled(&backend, "bob", 2);
    let (carol, _) = enrolled(&backend, "carol", 3);

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);
    let (bob_rt, mut bob_ui) =
        sim_client(&backend, ChatConfig::new(bob.clone()), MemoryKeyStore::new(), 20);

    let store = backend.clone();
    let script = async move {
        alice_ui.until(ready).await?;
        bob_ui.until(ready).await?;
        alice_ui.send(UserCommand::SelectPeer(carol.clone()))?;
        alice_ui.until(|app| app.active_peer().is_some()).await?;

        bob_ui.send(UserCommand::SelectPeer(alice.clone()))?;
        for n in 1..=3 {
            bob_ui.send(UserCommand::Send(format!("draft {n} ready")))?;
        }

        let viewing_carol = alice_ui.until(|app| app.unread(&bob) == 3).await?;
        assert_eq!(viewing_carol.unread(&carol), 0);

        alice_ui.send(UserCommand::SelectPeer(bob.clone()))?;
        let viewing_bob = alice_ui
            .until(|app| {
                let shown = app.conversation();
                shown.len() == 3 && shown.iter().all(|m| matches!(m.body, MessageBody::Text(_)))
            })
            .await?;
        assert_eq!(viewing_bob.unread(&bob), 0);
        assert!(alice_ui.scrolls().contains(&ScrollTarget::Latest));

        bob_ui
            .until(|app| app.conversation().iter().filter(|m| m.message.is_read).count() == 3)
            .await?;
        assert!(store.conversation(&alice, &bob).iter().all(|m| m.is_read));
        ScriptResult::Ok(())
    };

    let (a, b, s) = tokio::join!(alice_rt.run(), bob_rt.run(), script);
    s.unwrap();
    a.unwrap();
    b.unwrap();
}

#[tokio::test]
async fn unenrolled_peer_gets_plaintext_with_notice() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let carol = backend.add_user("carol");

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);

    let store = backend.clone();
    let script = async move {
        let view = alice_ui.until(ready).await?;
        assert!(!view.peers().iter().any(|p| p.has_e2ee()));

        alice_ui.send(UserCommand::SelectPeer(carol.clone()))?;
        alice_ui.send(UserCommand::Send("hi carol".into()))?;

        let view = alice_ui
            .until(|app| {
                app.notice().is_some_and(|n| n.text == PLAINTEXT_NOTICE)
                    && app.conversation().len() == 1
            })
            .await?;
        assert!(view.conversation()[0].outgoing);

        let stored = store.conversation(&alice, &carol);
        assert_eq!(stored[0].content, "hi carol");
        ScriptResult::Ok(())
    };

    let (a, s) = tokio::join!(alice_rt.run(), script);
    s.unwrap();
    a.unwrap();
}

fn stored(sender: &Identity, receiver: &Identity, timestamp: &str) -> ChatMessage {
    ChatMessage {
        sender: sender.clone(),
        receiver: receiver.clone(),
        content: format!("plain note {timestamp}"),
        timestamp: timestamp.to_string(),
        is_read: false,
    }
}

#[tokio::test]
async fn deleting_a_conversation_keeps_the_others() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let bob = backend.add_user("bob");
    let carol = backend.add_user("carol");
    backend.insert_message(stored(&alice, &bob, "t1"));
    backend.insert_message(stored(&bob, &alice, "t2"));
    backend.insert_message(stored(&carol, &alice, "t3"));

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);

    let store = backend.clone();
    let script = async move {
        let view = alice_ui.until(|app| app.messages().len() == 3).await?;
        assert_eq!(view.unread(&bob), 1);
        assert_eq!(view.unread(&carol), 1);

        alice_ui.send(UserCommand::DeleteConversation(bob.clone()))?;
        let view = alice_ui
            .until(|app| {
                app.notice().is_some_and(|n| n.text == "Conversation deleted.")
                    && app.messages().len() == 1
            })
            .await?;

        assert_eq!(view.unread(&bob), 0);
        assert_eq!(view.unread(&carol), 1);
        assert!(store.conversation(&alice, &bob).is_empty());
        assert_eq!(store.conversation(&alice, &carol).len(), 1);
        ScriptResult::Ok(())
    };

    let (a, s) = tokio::join!(alice_rt.run(), script);
    s.unwrap();
    a.unwrap();
}

#[tokio::test]
async fn redelivered_message_is_not_duplicated() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let bob = backend.add_user("bob");
    let first = stored(&bob, &alice, "t1");
    backend.insert_message(first.clone());

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);

    let store = backend.clone();
    let script = async move {
        alice_ui.until(|app| ready(app) && app.messages().len() == 1).await?;

        store.redeliver(&first);
        let second = stored(&bob, &alice, "t2");
        store.insert_message(second.clone());
        store.redeliver(&second);

        // The hub delivers in order: once the second message is in, the
        // duplicate has been handled.
        let view = alice_ui.until(|app| app.messages().iter().any(|m| m.timestamp == "t2")).await?;
        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.unread(&bob), 2);
        ScriptResult::Ok(())
    };

    let (a, s) = tokio::join!(alice_rt.run(), script);
    s.unwrap();
    a.unwrap();
}

#[tokio::test]
async fn legacy_sealed_message_is_readable() {
    let backend = SimBackend::new();
    let alice = backend.add_user("alice");
    let (bob, bob_keys) = enrolled(&backend, "bob", 2);
    let legacy = seal_legacy("before envelopes", bob_keys.public_key(), &SimEnv::with_seed(3))
        .unwrap();
    backend.insert_message(ChatMessage {
        sender: alice.clone(),
        receiver: bob.clone(),
        content: legacy,
        timestamp: "2023-12-31T23:59:59".into(),
        is_read: true,
    });

    let (bob_rt, mut bob_ui) =
        sim_client(&backend, ChatConfig::new(bob.clone()), MemoryKeyStore::new(), 20);

    let script = async move {
        bob_ui.until(ready).await?;
        bob_ui.send(UserCommand::SelectPeer(alice.clone()))?;
        bob_ui
            .until(|app| first_body(app) == Some(text("before envelopes")))
            .await?;
        ScriptResult::Ok(())
    };

    let (b, s) = tokio::join!(bob_rt.run(), script);
    s.unwrap();
    b.unwrap();
}

#[tokio::test]
async fn message_for_someone_else_renders_placeholder() {
    let backend = SimBackend::new();
    let alice = backend.add_user("alice");
    let (bob, _) = enrolled(&backend, "bob", 2);
    let stranger = KeyPair::generate([9; 32]);
    let sealed =
        seal_legacy("not for bob", stranger.public_key(), &SimEnv::with_seed(4)).unwrap();
    backend.insert_message(ChatMessage {
        sender: alice.clone(),
        receiver: bob.clone(),
        content: sealed,
        timestamp: "t1".into(),
        is_read: true,
    });

    let (bob_rt, mut bob_ui) =
        sim_client(&backend, ChatConfig::new(bob.clone()), MemoryKeyStore::new(), 20);

    let script = async move {
        bob_ui.until(ready).await?;
        bob_ui.send(UserCommand::SelectPeer(alice.clone()))?;
        let view = bob_ui
            .until(|app| first_body(app) == Some(MessageBody::Unreadable))
            .await?;
        assert_eq!(view.conversation()[0].body.display(), "[Encrypted Message]");
        ScriptResult::Ok(())
    };

    let (b, s) = tokio::join!(bob_rt.run(), script);
    s.unwrap();
    b.unwrap();
}

#[tokio::test]
async fn first_sign_in_generates_and_publishes_keys() {
    let backend = SimBackend::new();
    let dave = backend.add_user("dave");
    let local = MemoryKeyStore::new();

    let (dave_rt, mut dave_ui) =
        sim_client(&backend, ChatConfig::new(dave.clone()), local.clone(), 30);

    let store = backend.clone();
    let script = async move {
        let view = dave_ui.until(|app| app.key_source().is_some()).await?;
        assert_eq!(view.key_source(), Some(KeySource::Generated));
        assert!(store.published_key(&dave).is_some());
        assert!(store.key_bundle(&dave).complete().is_some());
        ScriptResult::Ok(())
    };

    let (d, s) = tokio::join!(dave_rt.run(), script);
    s.unwrap();
    d.unwrap();
}

#[tokio::test]
async fn offline_key_service_degrades_to_local_keys() {
    let backend = SimBackend::new();
    let (alice, keys) = enrolled(&backend, "alice", 1);
    let local = MemoryKeyStore::new();
    quill_core::LocalKeyStore::store(&local, &alice, &keys.export()).unwrap();
    backend.set_offline(true);

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), local, 10);

    let script = async move {
        let view = alice_ui
            .until(|app| app.key_source().is_some() && app.notice().is_some())
            .await?;
        assert_eq!(view.key_source(), Some(KeySource::LocalFallback));
        ScriptResult::Ok(())
    };

    let (a, s) = tokio::join!(alice_rt.run(), script);
    s.unwrap();
    a.unwrap();
}

#[tokio::test]
async fn send_fails_while_reconnecting_then_recovers() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let (bob, _) = enrolled(&backend, "bob", 2);

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);

    let store = backend.clone();
    let script = async move {
        alice_ui.until(ready).await?;
        alice_ui.send(UserCommand::SelectPeer(bob.clone()))?;
        alice_ui.until(|app| app.active_peer().is_some()).await?;

        store.signal(&alice, HubFrame::Reconnecting);
        alice_ui.until(|app| app.connection_state() == ConnectionState::Reconnecting).await?;

        alice_ui.send(UserCommand::Send("lost".into()))?;
        alice_ui
            .until(|app| {
                app.notice().is_some_and(|n| n.text.ends_with("Message not sent."))
            })
            .await?;
        assert!(store.messages().is_empty());

        store.signal(&alice, HubFrame::Reconnected);
        alice_ui.until(ready).await?;
        alice_ui.send(UserCommand::Send("retry".into()))?;
        alice_ui.until(|app| app.conversation().len() == 1).await?;
        assert_eq!(store.messages().len(), 1);
        ScriptResult::Ok(())
    };

    let (a, s) = tokio::join!(alice_rt.run(), script);
    s.unwrap();
    a.unwrap();
}

#[tokio::test]
async fn refused_hub_still_loads_history() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let bob = backend.add_user("bob");
    backend.insert_message(stored(&bob, &alice, "t1"));
    backend.refuse_connections(true);

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);

    let script = async move {
        let view = alice_ui
            .until(|app| {
                app.is_loaded()
                    && app.connection_state() == ConnectionState::Disconnected
                    && app.notice().is_some_and(|n| n.text == "Chat server connection failed.")
            })
            .await?;
        assert_eq!(view.unread(&bob), 1);

        alice_ui.send(UserCommand::SelectPeer(bob.clone()))?;
        alice_ui.send(UserCommand::Send("anyone there?".into()))?;
        alice_ui
            .until(|app| {
                app.notice()
                    .is_some_and(|n| n.text == "Not connected to chat server. Message not sent.")
            })
            .await?;
        ScriptResult::Ok(())
    };

    let (a, s) = tokio::join!(alice_rt.run(), script);
    s.unwrap();
    a.unwrap();
}

#[tokio::test]
async fn image_reply_round_trip() {
    let backend = SimBackend::new();
    let (alice, _) = enrolled(&backend, "alice", 1);
    let (bob, _) = enrolled(&backend, "bob", 2);

    let (alice_rt, mut alice_ui) =
        sim_client(&backend, ChatConfig::new(alice.clone()), MemoryKeyStore::new(), 10);
    let bob_config = ChatConfig { open_with: Some(alice.clone()), ..ChatConfig::new(bob.clone()) };
    let (bob_rt, mut bob_ui) = sim_client(&backend, bob_config, MemoryKeyStore::new(), 20);

    let script = async move {
        alice_ui.until(ready).await?;
        let bob_view = bob_ui.until(ready).await?;
        assert_eq!(bob_view.active_peer().map(|p| p.identity()), Some(alice.clone()));

        alice_ui.send(UserCommand::SelectPeer(bob.clone()))?;
        alice_ui.send(UserCommand::Attach(FileUpload {
            name: "cover.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }))?;
        alice_ui.until(|app| app.attachment().is_some()).await?;
        alice_ui.send(UserCommand::Send(String::new()))?;

        let view = bob_ui
            .until(|app| matches!(first_body(app), Some(MessageBody::Text(_))))
            .await?;
        let photo = view.conversation()[0].clone();
        let html = view.body_html(&photo);
        assert!(html.contains(r#"src="http://localhost:5200/uploads/1-cover.png""#));

        bob_ui.send(UserCommand::StartReply(photo.id.clone()))?;
        let view = bob_ui.until(|app| app.reply().is_some()).await?;
        assert_eq!(
            view.reply().map(|q| q.preview.clone()),
            Some(ReplyPreview::Photo {
                thumbnail: Some("http://localhost:5200/uploads/1-cover.png".into())
            })
        );

        bob_ui.send(UserCommand::Send("Approved".into()))?;
        let view = alice_ui
            .until(|app| {
                app.conversation().iter().any(|m| {
                    !m.outgoing && m.body.display().ends_with("Approved")
                })
            })
            .await?;
        assert!(view.attachment().is_none());

        alice_ui.send(UserCommand::JumpToQuote(photo.message.timestamp.clone()))?;
        let target = ScrollTarget::Message(photo.id.clone());
        for _ in 0..500 {
            if alice_ui.scrolls().contains(&target) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(alice_ui.scrolls().contains(&target));
        ScriptResult::Ok(())
    };

    let (a, b, s) = tokio::join!(alice_rt.run(), bob_rt.run(), script);
    s.unwrap();
    a.unwrap();
    b.unwrap();
}
