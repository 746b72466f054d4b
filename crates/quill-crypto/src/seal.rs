//! Public-key sealing: ephemeral X25519 agreement, HKDF-SHA256, AEAD.
//!
//! `seal` encrypts a payload so that only the holder of the recipient's
//! private key can open it. It is used two ways:
//!
//! - `wrap`/`unwrap`: protect a 32-byte [`SessionKey`] for one recipient
//! - directly on a whole message: the legacy single-recipient format
//!
//! Layout of a sealed payload:
//!
//! ```text
//! ephemeral_public (32) || nonce (24) || ciphertext (n + 16-byte tag)
//! ```

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::StaticSecret;
use zeroize::Zeroize;

use crate::{
    aead::{NONCE_SIZE, SESSION_KEY_SIZE, SessionKey, TAG_SIZE, aead_decrypt, aead_encrypt},
    error::CryptoError,
    keys::{KEY_SIZE, PrivateKey, PublicKey},
};

/// Bytes a sealed payload adds on top of its plaintext.
pub const SEAL_OVERHEAD: usize = KEY_SIZE + NONCE_SIZE + TAG_SIZE;

/// Size of a wrapped session key.
pub const WRAPPED_KEY_SIZE: usize = SESSION_KEY_SIZE + SEAL_OVERHEAD;

/// Label for deriving the sealing key
const SEAL_LABEL: &[u8] = b"quillSealV1";

/// Seal `plaintext` for `recipient`.
///
/// `ephemeral_secret` and `nonce` must be fresh random bytes per call.
///
/// # Errors
///
/// - `WeakPublicKey`: the recipient key is a low-order point
pub fn seal(
    recipient: &PublicKey,
    plaintext: &[u8],
    ephemeral_secret: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = StaticSecret::from(ephemeral_secret);
    let ephemeral_public =
        PublicKey::from_bytes(*x25519_dalek::PublicKey::from(&ephemeral).as_bytes());

    let shared = ephemeral.diffie_hellman(&recipient.to_dalek());
    if !shared.was_contributory() {
        return Err(CryptoError::WeakPublicKey);
    }

    let key = derive_seal_key(shared.as_bytes(), &ephemeral_public, recipient);
    let ciphertext = aead_encrypt(&key, &nonce, plaintext);

    let mut sealed = Vec::with_capacity(SEAL_OVERHEAD + plaintext.len());
    sealed.extend_from_slice(ephemeral_public.as_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a payload produced by [`seal`].
///
/// # Errors
///
/// - `Malformed`: shorter than [`SEAL_OVERHEAD`]
/// - `WeakPublicKey`: the embedded ephemeral key is a low-order point
/// - `DecryptionFailed`: not sealed for this key, or tampered
pub fn open(private_key: &PrivateKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < SEAL_OVERHEAD {
        return Err(CryptoError::Malformed {
            reason: format!("{} bytes, need at least {SEAL_OVERHEAD}", sealed.len()),
        });
    }

    let (ephemeral_bytes, rest) = sealed.split_at(KEY_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut ephemeral = [0u8; KEY_SIZE];
    ephemeral.copy_from_slice(ephemeral_bytes);
    let ephemeral_public = PublicKey::from_bytes(ephemeral);

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);

    let shared = private_key.diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        return Err(CryptoError::WeakPublicKey);
    }

    let key = derive_seal_key(shared.as_bytes(), &ephemeral_public, &private_key.public_key());
    aead_decrypt(&key, &nonce, ciphertext)
}

/// Wrap a session key for one recipient.
pub fn wrap(
    recipient: &PublicKey,
    session_key: &SessionKey,
    ephemeral_secret: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    seal(recipient, session_key.as_bytes(), ephemeral_secret, nonce)
}

/// Recover a session key wrapped by [`wrap`].
///
/// # Errors
///
/// Everything [`open`] returns, plus `Malformed` when the recovered key is
/// not exactly [`SESSION_KEY_SIZE`] bytes.
pub fn unwrap(private_key: &PrivateKey, wrapped: &[u8]) -> Result<SessionKey, CryptoError> {
    let mut raw = open(private_key, wrapped)?;

    let result = <[u8; SESSION_KEY_SIZE]>::try_from(raw.as_slice())
        .map(SessionKey::from_bytes)
        .map_err(|_| CryptoError::Malformed {
            reason: format!("wrapped key is {} bytes, expected {SESSION_KEY_SIZE}", raw.len()),
        });

    raw.zeroize();
    result
}

/// Derive the AEAD key for one sealed payload.
///
/// Salt binds the key to both the ephemeral and the recipient public key so a
/// payload cannot be replayed against a different recipient.
fn derive_seal_key(
    shared_secret: &[u8; KEY_SIZE],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> SessionKey {
    let mut salt = [0u8; 2 * KEY_SIZE];
    salt[..KEY_SIZE].copy_from_slice(ephemeral.as_bytes());
    salt[KEY_SIZE..].copy_from_slice(recipient.as_bytes());

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared_secret);

    let mut key = [0u8; SESSION_KEY_SIZE];
    let Ok(()) = hkdf.expand(SEAL_LABEL, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    SessionKey::from_bytes(key)
}
