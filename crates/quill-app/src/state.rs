//! Observable application state types.
//!
//! View-model structures the UI renders from: the peer list with unread
//! badges, messages of the active conversation with their decrypted bodies,
//! and transient notices.

use quill_proto::{ChatMessage, Identity, MessageId, User};

/// Shown in place of a message body that could not be decrypted.
pub const UNREADABLE_PLACEHOLDER: &str = "[Encrypted Message]";

/// A directory entry plus its unread badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Directory entry.
    pub user: User,
    /// Messages from this peer to us not yet read.
    pub unread: usize,
}

impl Peer {
    /// Peer identity.
    pub fn identity(&self) -> Identity {
        self.user.identity()
    }

    /// False when the peer never published a key; messages to them go out in
    /// plaintext.
    pub fn has_e2ee(&self) -> bool {
        self.user.public_key.is_some()
    }
}

/// Decryption status of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Decryption has not finished yet.
    Pending,
    /// Decrypted (or plaintext) content.
    Text(String),
    /// Decryption failed; rendered as [`UNREADABLE_PLACEHOLDER`].
    Unreadable,
}

impl MessageBody {
    /// Text to render. Empty while pending.
    pub fn display(&self) -> &str {
        match self {
            Self::Pending => "",
            Self::Text(text) => text,
            Self::Unreadable => UNREADABLE_PLACEHOLDER,
        }
    }
}

/// A message of the active conversation, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    /// Message id, used as the scroll anchor.
    pub id: MessageId,
    /// Stored message.
    pub message: ChatMessage,
    /// Decrypted body.
    pub body: MessageBody,
    /// True if we sent it.
    pub outgoing: bool,
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Operation succeeded.
    Success,
    /// Informational, nothing failed.
    Info,
    /// Operation failed.
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub text: String,
}

impl Notice {
    /// Success notice.
    pub fn success(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, text: text.into() }
    }

    /// Informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into() }
    }

    /// Error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into() }
    }
}

/// Where the view should scroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Bottom of the active conversation.
    Latest,
    /// A specific message, highlighted.
    Message(MessageId),
}
