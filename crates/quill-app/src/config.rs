//! Chat session configuration.

use quill_proto::Identity;

/// Default asset host for site-relative upload URLs.
pub const DEFAULT_ASSET_BASE: &str = "http://localhost:5200";

/// Default bound of the decrypt result channel.
pub const DEFAULT_DECRYPT_CHANNEL_CAPACITY: usize = 64;

/// Chat session configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Signed-in user
    pub identity: Identity,
    /// Peer to open once the directory has loaded
    pub open_with: Option<Identity>,
    /// Base URL site-relative `src`/`href` values are resolved against
    pub asset_base: String,
    /// Decrypted bodies buffered between workers and the event loop
    pub decrypt_channel_capacity: usize,
}

impl ChatConfig {
    /// Default configuration for `identity`.
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self { identity: identity.into(), ..Self::default() }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            identity: Identity::new(""),
            open_with: None,
            asset_base: DEFAULT_ASSET_BASE.to_string(),
            decrypt_channel_capacity: DEFAULT_DECRYPT_CHANNEL_CAPACITY,
        }
    }
}
