//! Message content formats.
//!
//! The `content` field of a stored message carries one of three formats,
//! depending on when and to whom it was sent:
//!
//! - Envelope v1: hybrid multi-recipient JSON (current format)
//! - Legacy cipher: base64 of a payload sealed directly to one recipient
//! - Plaintext: never encrypted (peer had no key, or pre-E2EE history)
//!
//! JSON carrying the envelope markers (`v` and `keys`) that fails to parse is
//! kept apart as a malformed envelope so it is never shown as text.
//!
//! [`MessageContent::classify`] is the single place that decides which one a
//! raw string is. Nothing downstream inspects the raw string again.
//!
//! # Wire format
//!
//! ```text
//! {"v":1,"nonce":"<b64>","ciphertext":"<b64>","keys":{"<identity>":"<b64>", ...}}
//! ```

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{Identity, error::Result};

/// Current envelope version.
pub const ENVELOPE_VERSION: u32 = 1;

/// Smallest payload that can be a legacy sealed message: ephemeral public key
/// (32) + nonce (24) + tag (16).
pub const MIN_LEGACY_CIPHERTEXT_LEN: usize = 72;

/// Hybrid multi-recipient envelope.
///
/// # Invariants
///
/// - `ciphertext` is the message body encrypted exactly once
/// - `keys` holds one wrapped session key per reader, sender included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Format version; [`ENVELOPE_VERSION`] for envelopes this crate writes.
    #[serde(rename = "v")]
    pub version: u32,

    /// AEAD nonce.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,

    /// Body ciphertext including the authentication tag.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,

    /// Session key wrapped for each reader.
    pub keys: BTreeMap<Identity, WrappedKey>,
}

impl Envelope {
    /// Serialize to the wire JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the wire JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Wrapped key for `identity`. `None` if they are not a reader.
    pub fn wrapped_key_for(&self, identity: &Identity) -> Option<&WrappedKey> {
        self.keys.get(identity)
    }
}

/// Session key sealed to one reader's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedKey(#[serde(with = "b64")] pub Vec<u8>);

impl WrappedKey {
    /// Raw sealed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Classified message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Never-encrypted text.
    Plaintext(String),
    /// Whole body sealed directly to a single recipient (pre-envelope format).
    LegacyCipher(Vec<u8>),
    /// Hybrid multi-recipient envelope.
    Envelope(Envelope),
    /// Envelope-shaped JSON that does not parse. Holds the raw string.
    MalformedEnvelope(String),
}

impl MessageContent {
    /// Classify a raw content string.
    ///
    /// JSON objects that parse as an envelope (version marker and key map
    /// present) are envelopes, whatever their version; rejecting unknown
    /// versions is the decoder's job. JSON objects with both markers that do
    /// not parse are malformed envelopes. Strict base64 long enough to hold a
    /// sealed payload is a legacy cipher. Everything else is plaintext.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.starts_with('{') {
            if let Ok(envelope) = serde_json::from_str::<Envelope>(trimmed) {
                return Self::Envelope(envelope);
            }
            if has_envelope_markers(trimmed) {
                return Self::MalformedEnvelope(raw.to_string());
            }
        }

        if !trimmed.is_empty()
            && !trimmed.contains(char::is_whitespace)
            && let Ok(bytes) = STANDARD.decode(trimmed)
            && bytes.len() >= MIN_LEGACY_CIPHERTEXT_LEN
        {
            return Self::LegacyCipher(bytes);
        }

        Self::Plaintext(raw.to_string())
    }

    /// Encode back to the raw content string stored and sent on the wire.
    pub fn to_wire(&self) -> Result<String> {
        match self {
            Self::Plaintext(text) | Self::MalformedEnvelope(text) => Ok(text.clone()),
            Self::LegacyCipher(bytes) => Ok(STANDARD.encode(bytes)),
            Self::Envelope(envelope) => envelope.to_json(),
        }
    }

    /// True for either encrypted format.
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Self::Plaintext(_))
    }
}

fn has_envelope_markers(json: &str) -> bool {
    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(json)
        .is_ok_and(|object| object.contains_key("v") && object.contains_key("keys"))
}

/// Serde adapter for base64 byte fields.
mod b64 {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}
