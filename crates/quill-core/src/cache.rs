//! Decryption cache.
//!
//! Maps a message id to its decrypted plaintext so each message is decrypted
//! at most once per session, however many times the view re-renders. Entries
//! are never evicted; a session holds a bounded conversation history.
//!
//! # Concurrency
//!
//! Cloning the cache shares the underlying map. Decryption runs without the
//! lock held, so two workers can race on the same miss; both produce the same
//! plaintext and the last insert wins.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use quill_proto::{ChatMessage, MessageId};

use crate::{codec::Decode, error::CodecError};

/// Shared memo of decrypted message bodies.
#[derive(Clone, Debug, Default)]
pub struct DecryptionCache {
    entries: Arc<RwLock<HashMap<MessageId, String>>>,
}

impl DecryptionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached plaintext for `id`, if present.
    pub fn get(&self, id: &MessageId) -> Option<String> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    /// Plaintext of `message`, decrypting and memoizing on first access.
    ///
    /// Failures are returned and not memoized, so a later attempt (for example
    /// after keys are resolved) can still succeed.
    pub fn get_or_decrypt<D: Decode + ?Sized>(
        &self,
        message: &ChatMessage,
        decoder: &D,
    ) -> Result<String, CodecError> {
        let id = message.id();
        if let Some(plaintext) = self.get(&id) {
            return Ok(plaintext);
        }

        let plaintext = decoder.decode(&message.content)?;
        tracing::debug!(sender = %id.sender, timestamp = %id.timestamp, "cached plaintext");

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, plaintext.clone());
        Ok(plaintext)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
