//! Quill wire protocol
//!
//! Types that cross a process boundary: the message content formats stored by
//! the backend, the JSON frames exchanged with the push hub, and the REST
//! bodies of the chat, directory and key-sync endpoints.
//!
//! # Components
//!
//! - [`MessageContent`]: tagged union over the three content formats (plus
//!   unparseable envelopes), classified once at the system boundary
//! - [`Envelope`]: hybrid multi-recipient envelope (v1)
//! - [`HubInvocation`] / [`HubEvent`]: hub RPCs and pushed events
//! - [`ChatMessage`], [`User`], [`KeyBundle`]: backend records

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod content;
mod error;
pub mod hub;
mod identity;
pub mod message;

pub use content::{
    ENVELOPE_VERSION, Envelope, MIN_LEGACY_CIPHERTEXT_LEN, MessageContent, WrappedKey,
};
pub use error::{ProtocolError, Result};
pub use hub::{HubEvent, HubInvocation};
pub use identity::Identity;
pub use message::{ChatMessage, KeyBundle, MessageId, UploadedFile, User};
