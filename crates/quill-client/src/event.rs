//! Transport events.

use quill_proto::{ChatMessage, Identity};

use crate::ConnectionState;

/// Events produced by [`crate::TransportClient::next_event`], in arrival
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A message was stored by the backend. Includes echoes of our own sends.
    MessageReceived(ChatMessage),

    /// `reader` has read everything `author` sent them.
    ReadReceiptUpdated {
        /// Who read
        reader: Identity,
        /// Whose messages were read
        author: Identity,
    },

    /// Connection state changed.
    StateChanged(ConnectionState),
}
