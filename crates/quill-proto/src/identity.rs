//! Chat identities.

use serde::{Deserialize, Serialize};

/// A chat participant, named by username.
///
/// Usernames are case-insensitive across the portal, so an identity is the
/// trimmed, lower-cased username. Every map keyed by participant uses this
/// type, which keeps `"Alice"` from the directory and `"alice"` from the hub
/// referring to the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Normalize a username into an identity.
    pub fn new(username: impl AsRef<str>) -> Self {
        Self(username.as_ref().trim().to_lowercase())
    }

    /// Normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
