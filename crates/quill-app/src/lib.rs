//! Application layer for Quill
//!
//! Pure state machine and generic runtime for the admin chat, so the same
//! orchestration code runs against the portal backend and in simulation.
//!
//! # Components
//!
//! - [`App`]: conversation state machine (peers, unread badges, composer)
//! - [`compose`]: reply previews, quote blocks and attachment fragments
//! - [`Driver`]: trait for the UI surface
//! - [`Runtime`]: event loop wiring App, transport, backend and decryption

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
pub mod compose;
mod config;
mod driver;
mod error;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::{App, PLAINTEXT_NOTICE, QUOTE_NOT_VISIBLE_NOTICE};
pub use compose::{Attachment, AttachmentKind, Quote, QuoteTarget, ReplyPreview};
pub use config::{ChatConfig, DEFAULT_ASSET_BASE, DEFAULT_DECRYPT_CHANNEL_CAPACITY};
pub use driver::Driver;
pub use error::ChatError;
pub use event::AppEvent;
pub use input::UserCommand;
pub use runtime::Runtime;
pub use state::{
    DisplayMessage, MessageBody, Notice, NoticeLevel, Peer, ScrollTarget, UNREADABLE_PLACEHOLDER,
};
