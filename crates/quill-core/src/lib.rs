//! Quill core
//!
//! Message-level cryptography and key lifecycle for the admin direct-message
//! chat, independent of any transport or UI.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   encode    ┌──────────────┐
//! │  plaintext   │────────────>│ Envelope v1  │──> transport
//! └──────────────┘             └──────────────┘
//!        ^                            │
//!        │  get_or_decrypt            │ classify + decode
//! ┌──────────────┐             ┌──────────────┐
//! │ Decryption   │<────────────│MessageDecoder│
//! │ Cache        │             └──────────────┘
//! └──────────────┘                    ^
//!                                     │ private key
//!                              ┌──────────────┐
//!                              │ KeyManager   │<── remote + local stores
//!                              └──────────────┘
//! ```
//!
//! # Components
//!
//! - [`codec`]: envelope encode/decode with plaintext fallback
//! - [`keys`]: [`KeyManager`] reconciling remote and local key pairs
//! - [`cache`]: [`DecryptionCache`], decrypt-once memo shared across workers
//! - [`api`]: collaborator traits for the portal backend
//! - [`env`]: randomness abstraction for deterministic tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod api;
pub mod cache;
pub mod codec;
pub mod env;
pub mod error;
pub mod keys;

pub use api::{ChatApi, FileUpload, KeyService};
pub use cache::DecryptionCache;
pub use codec::{
    Decode, MessageDecoder, OutgoingContent, decode, encode, encode_for_send, seal_legacy,
};
pub use env::{Environment, SystemEnv};
pub use error::{ApiError, CodecError, KeySyncError, StorageError};
pub use keys::{
    FileKeyStore, KeyManager, KeySource, LocalKeyStore, MemoryKeyStore, ResolvedKeys,
};
