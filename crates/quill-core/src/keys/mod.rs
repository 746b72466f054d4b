//! Identity key lifecycle.
//!
//! Reconciles the key pair held by the remote key service with the one in
//! local storage, once per session:
//!
//! ```text
//!            remote pair?
//!           /            \
//!         yes             no
//!          |               |
//!   import, store     local pair?
//!   locally, use     /          \
//!                  yes           no
//!                   |             |
//!              push to        generate, store
//!              remote         locally, push
//! ```
//!
//! Remote wins a conflict so every device converges on one pair. If the
//! remote cannot be used at all the manager falls back to the local pair, or
//! an ephemeral in-memory pair, and reports the degraded source.

mod store;

use quill_crypto::{KEY_SIZE, KeyPair};
use quill_proto::{Identity, KeyBundle};
pub use store::{FileKeyStore, LocalKeyStore, MemoryKeyStore};

use crate::{
    api::KeyService,
    env::Environment,
    error::{KeySyncError, StorageError},
};

/// Where the session's key pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Fetched from the remote key service.
    Remote,
    /// Loaded locally and pushed to the remote key service.
    LocalSynced,
    /// Generated this session and pushed to the remote key service.
    Generated,
    /// Remote unusable; local pair used without syncing.
    LocalFallback,
    /// Remote unusable and nothing stored locally; pair lives in memory only.
    Ephemeral,
}

impl KeySource {
    /// True if the pair may not be the one other devices and peers use.
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::LocalFallback | Self::Ephemeral)
    }
}

/// Outcome of [`KeyManager::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    /// Key pair to use for this session.
    pub key_pair: KeyPair,
    /// How it was obtained.
    pub source: KeySource,
}

/// Resolves the identity key pair for one user.
pub struct KeyManager<R, L, E> {
    identity: Identity,
    remote: R,
    local: L,
    env: E,
}

impl<R, L, E> KeyManager<R, L, E>
where
    R: KeyService,
    L: LocalKeyStore,
    E: Environment,
{
    /// Create a manager for `identity`.
    pub fn new(identity: Identity, remote: R, local: L, env: E) -> Self {
        Self { identity, remote, local, env }
    }

    /// Identity whose keys are managed.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Resolve the session key pair. Never fails; degraded outcomes are
    /// reported through [`ResolvedKeys::source`].
    pub async fn resolve(&self) -> ResolvedKeys {
        match self.sync().await {
            Ok(resolved) => {
                tracing::info!(
                    identity = %self.identity,
                    source = ?resolved.source,
                    "keys resolved"
                );
                resolved
            },
            Err(err) => {
                tracing::warn!(
                    identity = %self.identity,
                    error = %err,
                    "key sync failed, degrading"
                );
                self.fallback()
            },
        }
    }

    /// Reconcile remote and local state.
    ///
    /// # Errors
    ///
    /// - `Remote`: key service unreachable or rejected a request
    /// - `InvalidBundle`: the remote bundle does not import
    /// - `Local`: local persistence failed for a pair the remote does not
    ///   hold yet
    pub async fn sync(&self) -> Result<ResolvedKeys, KeySyncError> {
        let bundle = self.remote.fetch_key_bundle().await?;

        if let Some((public_key, private_key)) = bundle.complete() {
            let key_pair =
                KeyPair::import(public_key, private_key).map_err(KeySyncError::InvalidBundle)?;
            if let Err(err) = self.local.store(&self.identity, &key_pair.export()) {
                tracing::warn!(
                    identity = %self.identity,
                    error = %err,
                    "could not cache remote keys locally"
                );
            }
            return Ok(ResolvedKeys { key_pair, source: KeySource::Remote });
        }

        if let Some(key_pair) = self.load_local()? {
            self.push(&key_pair).await?;
            return Ok(ResolvedKeys { key_pair, source: KeySource::LocalSynced });
        }

        let key_pair = self.generate();
        self.local.store(&self.identity, &key_pair.export())?;
        self.push(&key_pair).await?;
        Ok(ResolvedKeys { key_pair, source: KeySource::Generated })
    }

    fn fallback(&self) -> ResolvedKeys {
        match self.load_local() {
            Ok(Some(key_pair)) => ResolvedKeys { key_pair, source: KeySource::LocalFallback },
            Ok(None) => ResolvedKeys { key_pair: self.generate(), source: KeySource::Ephemeral },
            Err(err) => {
                tracing::warn!(identity = %self.identity, error = %err, "local key store unusable");
                ResolvedKeys { key_pair: self.generate(), source: KeySource::Ephemeral }
            },
        }
    }

    /// Local pair, if one is stored and imports cleanly.
    ///
    /// A corrupt pair is treated as absent; it will be overwritten by the
    /// next successful resolution.
    fn load_local(&self) -> Result<Option<KeyPair>, StorageError> {
        let stored = match self.local.load(&self.identity) {
            Ok(stored) => stored,
            Err(StorageError::Corrupt(reason)) => {
                tracing::warn!(identity = %self.identity, %reason, "ignoring corrupt local keys");
                None
            },
            Err(err) => return Err(err),
        };

        let Some(exported) = stored else {
            return Ok(None);
        };

        match KeyPair::import(&exported.public_key, &exported.private_key) {
            Ok(pair) => Ok(Some(pair)),
            Err(err) => {
                tracing::warn!(identity = %self.identity, error = %err, "ignoring invalid keys");
                Ok(None)
            },
        }
    }

    async fn push(&self, key_pair: &KeyPair) -> Result<(), KeySyncError> {
        let exported = key_pair.export();
        let bundle = KeyBundle::new(exported.public_key, exported.private_key);
        self.remote.push_key_bundle(bundle).await?;
        Ok(())
    }

    fn generate(&self) -> KeyPair {
        KeyPair::generate(self.env.random_array::<KEY_SIZE>())
    }
}
