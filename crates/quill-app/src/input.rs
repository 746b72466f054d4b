//! User commands.
//!
//! Frontends translate clicks and key presses into [`UserCommand`]s; the
//! [`crate::App`] turns them into actions.

use quill_core::FileUpload;
use quill_proto::{Identity, MessageId};

/// A user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Open the conversation with a peer.
    SelectPeer(Identity),
    /// Send the typed text together with any pending reply and attachment.
    Send(String),
    /// Reply to a message of the active conversation.
    StartReply(MessageId),
    /// Drop the pending reply.
    CancelReply,
    /// Upload a file and attach it to the next message.
    Attach(FileUpload),
    /// Drop the pending attachment.
    RemoveAttachment,
    /// Follow a quote block's back-reference.
    JumpToQuote(String),
    /// Delete the whole conversation with a peer.
    DeleteConversation(Identity),
    /// Delete every conversation.
    ClearHistory,
    /// Leave the chat.
    Quit,
}
