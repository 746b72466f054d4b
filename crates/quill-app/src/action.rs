//! Application side-effects.
//!
//! [`AppAction`]s are produced by the [`crate::App`] state machine and executed
//! by the [`crate::Runtime`].

use quill_core::FileUpload;
use quill_proto::{ChatMessage, Identity, User};

use crate::ScrollTarget;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Fetch history and directory together.
    FetchHistory,

    /// Decrypt message bodies off the event loop.
    Decrypt(Vec<ChatMessage>),

    /// Tell the hub `reader` has read everything `author` sent them.
    MarkAsRead {
        /// Who read.
        reader: Identity,
        /// Whose messages were read.
        author: Identity,
    },

    /// Scroll the conversation view.
    Scroll(ScrollTarget),

    /// Upload a file for the pending attachment.
    UploadFile(FileUpload),

    /// Encode and send a composed body.
    SendMessage {
        /// Directory entry of the receiver, with their published key.
        peer: User,
        /// Composed plaintext.
        body: String,
    },

    /// Delete the conversation with `peer` on the backend.
    DeleteConversation {
        /// Other side of the conversation.
        peer: Identity,
    },

    /// Delete all history on the backend.
    ClearHistory,
}
