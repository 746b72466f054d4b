//! Application input events.
//!
//! [`AppEvent`] is the full set of inputs driving the [`crate::App`]:
//! user commands, transport notifications, and completions of actions the
//! runtime executed.

use quill_client::{ConnectionState, TransportEvent};
use quill_core::{CodecError, KeySource};
use quill_proto::{ChatMessage, Identity, MessageId, User};

use crate::{Attachment, ChatError, UserCommand};

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// User intent.
    Command(UserCommand),

    /// History and directory fetched.
    HistoryLoaded {
        /// Every message the current user sent or received.
        messages: Vec<ChatMessage>,
        /// User directory, current user included.
        users: Vec<User>,
    },

    /// History or directory fetch failed.
    LoadFailed {
        /// Cause.
        error: ChatError,
    },

    /// Session key pair resolved.
    KeysResolved {
        /// How the pair was obtained.
        source: KeySource,
    },

    /// Transport connection state changed.
    TransportStateChanged(ConnectionState),

    /// Message pushed by the hub, including echoes of our own sends.
    MessageReceived(ChatMessage),

    /// `reader` has read everything `author` sent them.
    ReadReceipt {
        /// Who read.
        reader: Identity,
        /// Whose messages were read.
        author: Identity,
    },

    /// A body finished decrypting.
    Decrypted {
        /// Message the body belongs to.
        id: MessageId,
        /// Plaintext, or why it is unreadable.
        result: Result<String, CodecError>,
    },

    /// Pending attachment uploaded.
    FileUploaded(Attachment),

    /// Message handed to the hub.
    MessageSent,

    /// Peer has no published key; the message went out unencrypted.
    PlaintextFallback,

    /// An action failed.
    Failed(ChatError),

    /// Conversation deleted on the backend.
    ConversationDeleted {
        /// Other side of the conversation.
        peer: Identity,
    },

    /// All history deleted on the backend.
    HistoryCleared,
}

impl From<TransportEvent> for AppEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::MessageReceived(message) => Self::MessageReceived(message),
            TransportEvent::ReadReceiptUpdated { reader, author } => {
                Self::ReadReceipt { reader, author }
            },
            TransportEvent::StateChanged(state) => Self::TransportStateChanged(state),
        }
    }
}
