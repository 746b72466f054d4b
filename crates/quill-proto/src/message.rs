//! Chat records exchanged with the portal backend.
//!
//! Field names follow the backend's camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::Identity;

/// A stored or pushed direct message.
///
/// `content` is the raw wire string; classify it with
/// [`crate::MessageContent::classify`] before use. Only `is_read` ever changes
/// after the message is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Author.
    pub sender: Identity,
    /// Addressee.
    pub receiver: Identity,
    /// Raw content (envelope JSON, legacy base64 or plaintext).
    pub content: String,
    /// Server-issued timestamp, opaque to the client.
    pub timestamp: String,
    /// Whether the receiver has read it.
    #[serde(default)]
    pub is_read: bool,
}

impl ChatMessage {
    /// Identifier used for deduplication and decryption caching.
    pub fn id(&self) -> MessageId {
        MessageId { timestamp: self.timestamp.clone(), sender: self.sender.clone() }
    }

    /// True if this message belongs to the conversation between `a` and `b`.
    pub fn is_between(&self, a: &Identity, b: &Identity) -> bool {
        (&self.sender == a && &self.receiver == b) || (&self.sender == b && &self.receiver == a)
    }
}

/// Message identity: the server timestamp plus the author.
///
/// The backend never issues two messages from one author with the same
/// timestamp, so this pair identifies a message across history fetches and
/// hub pushes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId {
    /// Server timestamp.
    pub timestamp: String,
    /// Author.
    pub sender: Identity,
}

/// Directory entry for a portal user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user id.
    pub id: u64,
    /// Login name (any case).
    pub username: String,
    /// Portal role, e.g. `"Admin"` or `"Editor"`.
    pub role: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Published public key. `None` means the user never enrolled in E2EE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl User {
    /// Identity derived from the username.
    pub fn identity(&self) -> Identity {
        Identity::new(&self.username)
    }

    /// Name to show in lists: full name when set, else username.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Key material synced through the backend's key service.
///
/// The service returns empty fields when nothing has been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    /// Base64 public key.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Base64 private key.
    #[serde(default)]
    pub private_key: Option<String>,
}

impl KeyBundle {
    /// Bundle holding both halves.
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self { public_key: Some(public_key.into()), private_key: Some(private_key.into()) }
    }

    /// Both halves, when the bundle is complete and non-empty.
    pub fn complete(&self) -> Option<(&str, &str)> {
        match (self.public_key.as_deref(), self.private_key.as_deref()) {
            (Some(public), Some(private)) if !public.is_empty() && !private.is_empty() => {
                Some((public, private))
            },
            _ => None,
        }
    }
}

/// Response from the file-hosting upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Where the file can be fetched. May be site-relative (`/uploads/..`).
    pub url: String,
}
