//! X25519 identity keys and their interchange encoding.
//!
//! Keys travel between the browser-era key store, the remote key service and
//! the user directory as standard base64 of the raw 32-byte key.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use x25519_dalek::{SharedSecret, StaticSecret};

use crate::error::CryptoError;

/// Size of an X25519 public or private key in bytes.
pub const KEY_SIZE: usize = 32;

/// Published half of an identity key pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encode to the interchange string format.
    pub fn export(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decode from the interchange string format.
    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        decode_key(encoded).map(Self)
    }

    pub(crate) fn to_dalek(self) -> x25519_dalek::PublicKey {
        x25519_dalek::PublicKey::from(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.export())
    }
}

/// Secret half of an identity key pair. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Build a private key from 32 secret bytes.
    ///
    /// Any 32 bytes are valid; clamping happens during key agreement.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Public key bound to this private key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(*x25519_dalek::PublicKey::from(&self.0).as_bytes())
    }

    /// Encode to the interchange string format.
    pub fn export(&self) -> String {
        STANDARD.encode(self.0.to_bytes())
    }

    /// Decode from the interchange string format.
    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        decode_key(encoded).map(Self::from_bytes)
    }

    pub(crate) fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        self.0.diffie_hellman(&their_public.to_dalek())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// An identity key pair.
///
/// # Invariants
///
/// - `public` is always derived from `private`; constructors that accept both
///   halves verify the binding
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

/// Key pair in interchange form, ready for persistence or sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedKeyPair {
    /// Base64 public key.
    pub public_key: String,
    /// Base64 private key.
    pub private_key: String,
}

impl KeyPair {
    /// Generate a key pair from caller-provided secret entropy.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production.
    pub fn generate(secret: [u8; KEY_SIZE]) -> Self {
        Self::from_private(PrivateKey::from_bytes(secret))
    }

    /// Derive the pair from its private half.
    pub fn from_private(private: PrivateKey) -> Self {
        Self { public: private.public_key(), private }
    }

    /// Import both halves, verifying the public key belongs to the private key.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: either string is not a base64 32-byte key
    /// - `KeyMismatch`: the public key is not derived from the private key
    pub fn import(public_key: &str, private_key: &str) -> Result<Self, CryptoError> {
        let public = PublicKey::import(public_key)?;
        let pair = Self::from_private(PrivateKey::import(private_key)?);
        if pair.public != public {
            return Err(CryptoError::KeyMismatch);
        }
        Ok(pair)
    }

    /// Export both halves.
    pub fn export(&self) -> ExportedKeyPair {
        ExportedKeyPair { public_key: self.public.export(), private_key: self.private.export() }
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_SIZE], CryptoError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::InvalidKey { reason: format!("base64: {e}") })?;

    <[u8; KEY_SIZE]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::InvalidKey {
        reason: format!("expected {KEY_SIZE} bytes, got {}", bytes.len()),
    })
}
