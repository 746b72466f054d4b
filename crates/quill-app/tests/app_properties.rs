//! Property-based tests for the App state machine.
//!
//! Arbitrary sequences of loads, pushed messages, peer selections and read
//! receipts must keep the unread badges consistent with the loaded history.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "Test helpers")]

use std::collections::HashSet;

use proptest::prelude::*;
use quill_app::{App, AppEvent, ChatConfig, Peer};
use quill_proto::{ChatMessage, Identity, User};

const NAMES: [&str; 4] = ["me", "bob", "carol", "dave"];

fn user(name: &str) -> User {
    User {
        id: 0,
        username: name.to_string(),
        role: "Admin".to_string(),
        full_name: None,
        public_key: None,
    }
}

fn name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(NAMES.to_vec())
}

fn message() -> impl Strategy<Value = ChatMessage> {
    (name(), name(), 0u8..8, any::<bool>()).prop_map(|(sender, receiver, ts, is_read)| {
        ChatMessage {
            sender: sender.into(),
            receiver: receiver.into(),
            content: format!("{sender}:{ts}"),
            timestamp: format!("2024-05-01T10:00:0{ts}"),
            is_read,
        }
    })
}

/// Events as a frontend plus hub would deliver them. `dave` is never in the
/// directory.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        1 => prop::collection::vec(message(), 0..10).prop_map(|messages| {
            AppEvent::HistoryLoaded {
                messages,
                users: ["me", "bob", "carol"].into_iter().map(user).collect(),
            }
        }),
        4 => message().prop_map(AppEvent::MessageReceived),
        2 => name().prop_map(|peer| AppEvent::Command(quill_app::UserCommand::SelectPeer(
            peer.into(),
        ))),
        1 => (name(), name()).prop_map(|(reader, author)| AppEvent::ReadReceipt {
            reader: reader.into(),
            author: author.into(),
        }),
    ]
}

fn check_invariants(app: &App) -> Result<(), TestCaseError> {
    let me = app.identity();

    prop_assert!(app.peers().iter().all(|p| &p.identity() != me), "self listed as peer");

    let ids: HashSet<_> = app.messages().iter().map(ChatMessage::id).collect();
    prop_assert_eq!(ids.len(), app.messages().len(), "duplicate message");

    for peer in app.peers() {
        let identity = peer.identity();
        let expected = app
            .messages()
            .iter()
            .filter(|m| m.sender == identity && &m.receiver == me && !m.is_read)
            .count();
        prop_assert_eq!(peer.unread, expected, "unread mismatch for {}", identity);
    }

    if let Some(active) = app.active_peer() {
        prop_assert_eq!(active.unread, 0);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_unread_matches_history(events in prop::collection::vec(event_strategy(), 1..40)) {
        let mut app = App::new(&ChatConfig::new("me"));

        for event in events {
            let _ = app.handle(event);
            check_invariants(&app)?;
        }
    }

    #[test]
    fn prop_conversation_only_shows_active_pair(
        events in prop::collection::vec(event_strategy(), 1..40)
    ) {
        let mut app = App::new(&ChatConfig::new("me"));
        for event in events {
            let _ = app.handle(event);
        }

        let me = Identity::new("me");
        match app.active_peer().map(Peer::identity) {
            Some(peer) => {
                for shown in app.conversation() {
                    prop_assert!(shown.message.is_between(&me, &peer));
                }
            },
            None => prop_assert!(app.conversation().is_empty()),
        }
    }
}
