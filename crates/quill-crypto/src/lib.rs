//! Quill Cryptographic Primitives
//!
//! Building blocks for Quill's hybrid message envelope. Pure functions with
//! deterministic outputs. Callers provide random bytes for deterministic
//! testing.
//!
//! # Hybrid Encryption
//!
//! Each message body is encrypted once under a fresh session key. The session
//! key is then sealed separately for every identity allowed to read the
//! message, so adding a recipient costs one wrapped key, not one copy of the
//! body.
//!
//! ```text
//! random 32 bytes ─────────────► Session Key
//!                                     │
//!        plaintext ── AEAD ───────────┤──► ciphertext (once)
//!                                     │
//!        recipient public key ── seal ┴──► wrapped key (per recipient)
//! ```
//!
//! # Primitives
//!
//! - Identity keys: X25519, exported as base64 of the raw 32 bytes
//! - AEAD: XChaCha20-Poly1305 with a 24-byte random nonce
//! - Sealing: ephemeral X25519 agreement, HKDF-SHA256, XChaCha20-Poly1305
//!
//! # Security
//!
//! Authenticity:
//! - Failed authentication tag -> reject, never return a partial plaintext
//! - Sealing keys are bound to both the ephemeral and the recipient key
//!
//! Known limits:
//! - Identity keys are long-lived; there is no rotation or forward secrecy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
mod error;
pub mod keys;
pub mod seal;

pub use aead::{NONCE_SIZE, SESSION_KEY_SIZE, SessionKey, TAG_SIZE, aead_decrypt, aead_encrypt};
pub use error::CryptoError;
pub use keys::{ExportedKeyPair, KEY_SIZE, KeyPair, PrivateKey, PublicKey};
pub use seal::{SEAL_OVERHEAD, WRAPPED_KEY_SIZE, open, seal, unwrap, wrap};
