//! Error types for the Quill core.
//!
//! Strongly-typed errors per component: the envelope codec, the collaborator
//! API, local key persistence and key synchronization. Each maps onto one
//! user-facing outcome: a placeholder for an unreadable message, a degraded
//! key mode, or a notice.

use quill_crypto::CryptoError;
use quill_proto::{Identity, ProtocolError};
use thiserror::Error;

/// Errors encoding or decoding message content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Envelope has no wrapped key for the reader.
    #[error("envelope has no key for {identity}")]
    KeyNotFound {
        /// Reader that was looked up
        identity: Identity,
    },

    /// Cryptographic failure: wrong key, corrupted or tampered data.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Failure detail
        reason: String,
    },

    /// Envelope version this client cannot read.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    /// A recipient's published key could not be imported.
    #[error("invalid public key for {identity}: {source}")]
    InvalidRecipientKey {
        /// Recipient whose key was rejected
        identity: Identity,
        /// Import failure
        #[source]
        source: CryptoError,
    },

    /// Encoding was asked to produce an envelope nobody can read.
    #[error("envelope has no recipients")]
    NoRecipients,

    /// Key wrapping failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Envelope serialization failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl CodecError {
    pub(crate) fn decryption(err: impl std::fmt::Display) -> Self {
        Self::Decryption { reason: err.to_string() }
    }
}

/// Errors from the backend collaborator API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with an error status.
    #[error("backend rejected request ({status}): {message}")]
    Rejected {
        /// HTTP-style status code
        status: u16,
        /// Response message
        message: String,
    },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from local key persistence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("i/o error: {0}")]
    Io(String),

    /// Stored data could not be parsed.
    #[error("corrupt key file: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors synchronizing the identity key pair with the remote key service.
///
/// Never fatal: the key manager degrades to a local or ephemeral pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeySyncError {
    /// Remote key service unreachable or failing.
    #[error("remote key store unavailable: {0}")]
    Remote(#[from] ApiError),

    /// Remote bundle present but unusable.
    #[error("remote key bundle invalid: {0}")]
    InvalidBundle(#[source] CryptoError),

    /// Local key persistence failed.
    #[error("local key store failed: {0}")]
    Local(#[from] StorageError),
}
