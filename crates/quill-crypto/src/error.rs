//! Errors for the cryptographic primitives.

use thiserror::Error;

/// Errors produced by key handling, sealing and AEAD operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key string could not be decoded into a 32-byte key.
    #[error("invalid key encoding: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Exported public key is not the one derived from the private key.
    #[error("public key does not match private key")]
    KeyMismatch,

    /// Key agreement produced an all-zero secret (low-order public key).
    #[error("public key is a low-order point")]
    WeakPublicKey,

    /// Sealed payload is too short or has the wrong layout.
    #[error("malformed sealed payload: {reason}")]
    Malformed {
        /// What was wrong with the payload
        reason: String,
    },

    /// Authentication tag did not verify (wrong key or tampered data).
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Failure detail
        reason: String,
    },
}
