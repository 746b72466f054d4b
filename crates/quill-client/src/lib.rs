//! Quill transport client
//!
//! Four-state connection machine over a real-time push hub. Sends are only
//! accepted while connected; there is no outbox. Incoming hub frames become
//! [`TransportEvent`]s delivered in arrival order.
//!
//! # Components
//!
//! - [`TransportClient`]: state machine plus RPC gating
//! - [`Hub`]: contract the push-hub implementation fulfils
//! - [`ConnectionState`]: lifecycle states and legal transitions

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod hub;
mod state;

pub use client::TransportClient;
pub use error::TransportError;
pub use event::TransportEvent;
pub use hub::{Hub, HubFrame};
pub use state::ConnectionState;
