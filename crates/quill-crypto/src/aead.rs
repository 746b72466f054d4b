//! Symmetric authenticated encryption using `XChaCha20-Poly1305`
//!
//! All functions are pure - keys and nonces are provided by the caller.
//! This keeps envelope construction deterministic under a seeded environment.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of a session key in bytes.
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of the `XChaCha20` nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Single-use symmetric key protecting one message body.
///
/// Every message gets a fresh session key which is then wrapped once per
/// recipient. The raw bytes are zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Build a session key from raw bytes.
    pub fn from_bytes(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Raw key bytes, used when wrapping the key for a recipient.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Encrypt `plaintext` under `key`.
///
/// Returns the ciphertext with the 16-byte Poly1305 tag appended.
///
/// # Security
///
/// - A (key, nonce) pair must never be reused; callers draw both from a
///   cryptographically secure source per message
pub fn aead_encrypt(key: &SessionKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt and authenticate `ciphertext` under `key`.
///
/// # Errors
///
/// - `DecryptionFailed`: the tag did not verify (wrong key or tampering)
pub fn aead_decrypt(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed {
            reason: format!("ciphertext shorter than tag: {} bytes", ciphertext.len()),
        });
    }

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher.decrypt(XNonce::from_slice(nonce), ciphertext).map_err(|_| {
        CryptoError::DecryptionFailed { reason: "authentication failed".to_string() }
    })
}
