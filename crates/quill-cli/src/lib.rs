//! Quill operator tooling.
//!
//! Offline helpers around the message codec: provision an identity key pair
//! into a local key directory, seal a message the way the chat client would,
//! open stored content as a given admin, and describe what format a raw
//! content string is in. Nothing here talks to the portal backend.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::collections::BTreeMap;

use quill_core::{
    CodecError, Decode, Environment, LocalKeyStore, MessageDecoder, StorageError, encode,
    seal_legacy,
};
use quill_crypto::{CryptoError, ExportedKeyPair, KeyPair, PublicKey};
use quill_proto::{Identity, MessageContent, ProtocolError};
use thiserror::Error;

/// Errors from operator commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// A key pair already exists and overwriting was not requested.
    #[error("{0} already has a key pair; pass --force to replace it")]
    KeyExists(Identity),

    /// No key pair is stored for the identity.
    #[error("no key pair stored for {0}")]
    MissingKeys(Identity),

    /// A `--to` argument was not `identity=public_key`.
    #[error("invalid recipient {0:?}, expected identity=public_key")]
    InvalidRecipient(String),

    /// Legacy sealing takes exactly one recipient.
    #[error("legacy sealing needs exactly one recipient, got {0}")]
    LegacyRecipients(usize),

    /// Local key directory failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Key import failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Encoding or decoding failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Envelope serialization failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Generate a key pair for `identity` and persist it in `store`.
///
/// Refuses to replace an existing pair unless `force` is set: losing the
/// private key makes every envelope addressed to it unreadable.
pub fn keygen<L: LocalKeyStore, E: Environment>(
    store: &L,
    identity: &Identity,
    force: bool,
    env: &E,
) -> Result<ExportedKeyPair, CliError> {
    if !force && store.load(identity)?.is_some() {
        return Err(CliError::KeyExists(identity.clone()));
    }

    let exported = KeyPair::generate(env.random_array()).export();
    store.store(identity, &exported)?;

    tracing::info!(%identity, "generated key pair");
    Ok(exported)
}

/// Parse a `identity=public_key` recipient argument.
pub fn parse_recipient(arg: &str) -> Result<(Identity, PublicKey), CliError> {
    let (name, key) =
        arg.split_once('=').ok_or_else(|| CliError::InvalidRecipient(arg.to_string()))?;
    if name.is_empty() {
        return Err(CliError::InvalidRecipient(arg.to_string()));
    }
    Ok((Identity::new(name), PublicKey::import(key)?))
}

/// Seal `plaintext` from `sender` to `recipients`.
///
/// Envelopes always include the sender so the message stays readable in
/// their own history. Legacy output seals the body to the single recipient
/// and nobody else.
pub fn seal<L: LocalKeyStore, E: Environment>(
    store: &L,
    sender: &Identity,
    recipients: &[(Identity, PublicKey)],
    plaintext: &str,
    legacy: bool,
    env: &E,
) -> Result<String, CliError> {
    if legacy {
        let [(_, recipient)] = recipients else {
            return Err(CliError::LegacyRecipients(recipients.len()));
        };
        return Ok(seal_legacy(plaintext, recipient, env)?);
    }

    let own = load_pair(store, sender)?;
    let mut keys: BTreeMap<Identity, PublicKey> = recipients.iter().cloned().collect();
    keys.insert(sender.clone(), *own.public_key());

    Ok(encode(plaintext, &keys, env)?.to_json()?)
}

/// Recover the plaintext of raw content as `identity`.
pub fn open<L: LocalKeyStore>(
    store: &L,
    identity: &Identity,
    raw: &str,
) -> Result<String, CliError> {
    let pair = load_pair(store, identity)?;
    let decoder = MessageDecoder::new(identity.clone(), pair.private_key().clone());
    Ok(decoder.decode(raw)?)
}

/// One-line description of a raw content string.
pub fn describe(raw: &str) -> String {
    match MessageContent::classify(raw) {
        MessageContent::Plaintext(text) => format!("plaintext ({} bytes)", text.len()),
        MessageContent::LegacyCipher(sealed) => {
            format!("legacy sealed box ({} bytes)", sealed.len())
        },
        MessageContent::MalformedEnvelope(json) => {
            format!("malformed envelope ({} bytes)", json.len())
        },
        MessageContent::Envelope(envelope) => {
            let readers: Vec<&str> = envelope.keys.keys().map(Identity::as_str).collect();
            format!(
                "envelope v{} ({} ciphertext bytes) for {}",
                envelope.version,
                envelope.ciphertext.len(),
                readers.join(", ")
            )
        },
    }
}

fn load_pair<L: LocalKeyStore>(store: &L, identity: &Identity) -> Result<KeyPair, CliError> {
    let exported = store.load(identity)?.ok_or_else(|| CliError::MissingKeys(identity.clone()))?;
    Ok(KeyPair::import(&exported.public_key, &exported.private_key)?)
}
