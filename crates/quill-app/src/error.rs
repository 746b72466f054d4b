//! Application-level errors.
//!
//! [`ChatError`] aggregates the component errors that can reach the user.
//! None of them is fatal: each becomes a [`Notice`] and the session carries on.

use quill_client::TransportError;
use quill_core::{ApiError, CodecError};
use thiserror::Error;

use crate::Notice;

/// Errors surfaced to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Outgoing message could not be encoded.
    #[error("encoding failed: {0}")]
    Codec(#[from] CodecError),

    /// Hub refused the connection or the send.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// Backend request failed.
    #[error("backend: {0}")]
    Api(#[from] ApiError),

    /// File upload failed.
    #[error("upload failed: {0}")]
    Upload(#[source] ApiError),
}

impl ChatError {
    /// Notice shown to the user.
    pub fn notice(&self) -> Notice {
        match self {
            Self::Codec(_) => Notice::error("Encryption failed. Message not sent."),
            Self::Transport(TransportError::SendFailed { .. }) => {
                Notice::error("Not connected to chat server. Message not sent.")
            },
            Self::Transport(_) => Notice::error("Chat server connection failed."),
            Self::Api(_) => Notice::error("Chat server request failed."),
            Self::Upload(_) => Notice::error("Failed to upload file"),
        }
    }
}
