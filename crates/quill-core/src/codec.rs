//! Envelope codec.
//!
//! Turns outgoing plaintext into wire content and wire content back into
//! plaintext. Encoding always produces a v1 [`Envelope`]; decoding accepts
//! every format in [`MessageContent`].
//!
//! # Cost
//!
//! One AEAD pass over the body plus one key wrap per recipient. Adding a
//! reader grows the message by one wrapped key, never by another copy of the
//! body.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use quill_crypto::{
    NONCE_SIZE, PrivateKey, PublicKey, SessionKey, aead_decrypt, aead_encrypt, open, seal, unwrap,
    wrap,
};
use quill_proto::{ENVELOPE_VERSION, Envelope, Identity, MessageContent, User, WrappedKey};

use crate::{env::Environment, error::CodecError};

/// Encrypt `plaintext` once and wrap the session key for every recipient.
///
/// `recipients` must include the sender so their own history stays readable.
///
/// # Errors
///
/// - `NoRecipients`: empty recipient map
/// - `Crypto`: a recipient key is a low-order point
pub fn encode<E: Environment>(
    plaintext: &str,
    recipients: &BTreeMap<Identity, PublicKey>,
    env: &E,
) -> Result<Envelope, CodecError> {
    if recipients.is_empty() {
        return Err(CodecError::NoRecipients);
    }

    let session_key = SessionKey::from_bytes(env.random_array());
    let nonce: [u8; NONCE_SIZE] = env.random_array();
    let ciphertext = aead_encrypt(&session_key, &nonce, plaintext.as_bytes());

    let mut keys = BTreeMap::new();
    for (identity, public_key) in recipients {
        let wrapped = wrap(public_key, &session_key, env.random_array(), env.random_array())?;
        keys.insert(identity.clone(), WrappedKey(wrapped));
    }

    tracing::debug!(recipients = keys.len(), bytes = plaintext.len(), "encoded envelope");

    Ok(Envelope { version: ENVELOPE_VERSION, nonce: nonce.to_vec(), ciphertext, keys })
}

/// Recover the plaintext of classified content as `identity`.
///
/// # Errors
///
/// - `KeyNotFound`: envelope was not addressed to `identity`
/// - `UnsupportedVersion`: envelope version is not 1
/// - `Decryption`: any cryptographic failure; a wrong plaintext is never
///   returned
pub fn decode(
    content: &MessageContent,
    identity: &Identity,
    private_key: &PrivateKey,
) -> Result<String, CodecError> {
    match content {
        MessageContent::Plaintext(text) => Ok(text.clone()),
        MessageContent::LegacyCipher(sealed) => {
            let plaintext = open(private_key, sealed).map_err(CodecError::decryption)?;
            into_text(plaintext)
        },
        MessageContent::Envelope(envelope) => decode_envelope(envelope, identity, private_key),
        MessageContent::MalformedEnvelope(_) => {
            Err(CodecError::Decryption { reason: "malformed envelope".to_string() })
        },
    }
}

fn decode_envelope(
    envelope: &Envelope,
    identity: &Identity,
    private_key: &PrivateKey,
) -> Result<String, CodecError> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(CodecError::UnsupportedVersion(envelope.version));
    }

    let wrapped = envelope
        .wrapped_key_for(identity)
        .ok_or_else(|| CodecError::KeyNotFound { identity: identity.clone() })?;

    let nonce = <[u8; NONCE_SIZE]>::try_from(envelope.nonce.as_slice()).map_err(|_| {
        CodecError::Decryption { reason: format!("nonce is {} bytes", envelope.nonce.len()) }
    })?;

    let session_key = unwrap(private_key, wrapped.as_bytes()).map_err(CodecError::decryption)?;
    let plaintext =
        aead_decrypt(&session_key, &nonce, &envelope.ciphertext).map_err(CodecError::decryption)?;

    into_text(plaintext)
}

fn into_text(plaintext: Vec<u8>) -> Result<String, CodecError> {
    String::from_utf8(plaintext)
        .map_err(|_| CodecError::Decryption { reason: "plaintext is not utf-8".to_string() })
}

/// Produce legacy single-recipient content: the whole body sealed directly to
/// one public key, base64 encoded.
///
/// Kept for tooling and compatibility tests; new messages use [`encode`].
pub fn seal_legacy<E: Environment>(
    plaintext: &str,
    recipient: &PublicKey,
    env: &E,
) -> Result<String, CodecError> {
    let sealed = seal(recipient, plaintext.as_bytes(), env.random_array(), env.random_array())?;
    Ok(STANDARD.encode(sealed))
}

/// Wire content ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingContent {
    /// Raw content string.
    pub content: String,
    /// False when the peer has no key and the body went out as plaintext.
    pub encrypted: bool,
}

/// Encode a direct message from `sender` to `peer`.
///
/// Peers that never enrolled (no published key) get the plaintext; sending
/// is never blocked on enrollment.
///
/// # Errors
///
/// - `InvalidRecipientKey`: the peer's published key does not import
/// - anything [`encode`] returns
pub fn encode_for_send<E: Environment>(
    plaintext: &str,
    sender: &Identity,
    sender_key: &PublicKey,
    peer: &User,
    env: &E,
) -> Result<OutgoingContent, CodecError> {
    let peer_identity = peer.identity();

    let Some(encoded_key) = peer.public_key.as_deref() else {
        tracing::info!(peer = %peer_identity, "peer has no public key, sending plaintext");
        return Ok(OutgoingContent { content: plaintext.to_string(), encrypted: false });
    };

    let peer_key = PublicKey::import(encoded_key).map_err(|source| {
        CodecError::InvalidRecipientKey { identity: peer_identity.clone(), source }
    })?;

    let mut recipients = BTreeMap::new();
    recipients.insert(peer_identity, peer_key);
    recipients.insert(sender.clone(), *sender_key);

    let envelope = encode(plaintext, &recipients, env)?;
    Ok(OutgoingContent { content: envelope.to_json()?, encrypted: true })
}

/// Something that can turn raw wire content into plaintext.
///
/// The decryption cache is generic over this so it can be exercised without
/// real keys.
pub trait Decode: Send + Sync {
    /// Decode raw wire content.
    fn decode(&self, raw: &str) -> Result<String, CodecError>;
}

/// Decoder bound to the local identity and its private key.
#[derive(Clone, Debug)]
pub struct MessageDecoder {
    identity: Identity,
    private_key: PrivateKey,
}

impl MessageDecoder {
    /// Create a decoder for `identity`.
    pub fn new(identity: Identity, private_key: PrivateKey) -> Self {
        Self { identity, private_key }
    }

    /// Identity this decoder reads as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Decode for MessageDecoder {
    fn decode(&self, raw: &str) -> Result<String, CodecError> {
        decode(&MessageContent::classify(raw), &self.identity, &self.private_key)
    }
}
