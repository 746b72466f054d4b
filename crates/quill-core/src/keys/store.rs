//! Local key persistence.
//!
//! One slot per identity holding both halves of the key pair in interchange
//! form. The trait is synchronous; the stores are small and local.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use quill_crypto::ExportedKeyPair;
use quill_proto::Identity;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Per-identity storage for the identity key pair.
///
/// Must be Clone (shared between the key manager and tooling), Send + Sync.
/// Implementations share state across clones.
pub trait LocalKeyStore: Clone + Send + Sync + 'static {
    /// Stored pair for `identity`. `None` if nothing was stored.
    fn load(&self, identity: &Identity) -> Result<Option<ExportedKeyPair>, StorageError>;

    /// Store the pair for `identity`, replacing any previous one.
    fn store(&self, identity: &Identity, pair: &ExportedKeyPair) -> Result<(), StorageError>;

    /// Forget the pair for `identity`. Missing entries are not an error.
    fn remove(&self, identity: &Identity) -> Result<(), StorageError>;
}

/// In-memory key store for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyStore {
    slots: Arc<Mutex<HashMap<Identity, ExportedKeyPair>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalKeyStore for MemoryKeyStore {
    fn load(&self, identity: &Identity) -> Result<Option<ExportedKeyPair>, StorageError> {
        Ok(self.slots.lock().unwrap_or_else(PoisonError::into_inner).get(identity).cloned())
    }

    fn store(&self, identity: &Identity, pair: &ExportedKeyPair) -> Result<(), StorageError> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.clone(), pair.clone());
        Ok(())
    }

    fn remove(&self, identity: &Identity) -> Result<(), StorageError> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).remove(identity);
        Ok(())
    }
}

/// On-disk form of a stored pair.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPair {
    public_key: String,
    private_key: String,
}

/// JSON file per identity under a directory: `<dir>/<identity>.json`.
#[derive(Clone, Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, identity: &Identity) -> PathBuf {
        // Identities are usernames; keep them from escaping the directory.
        let name: String = identity.as_str().chars().map(file_safe).collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn file_safe(c: char) -> char {
    if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') { c } else { '_' }
}

impl LocalKeyStore for FileKeyStore {
    fn load(&self, identity: &Identity) -> Result<Option<ExportedKeyPair>, StorageError> {
        let path = self.path_for(identity);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let stored: StoredPair = serde_json::from_str(&json)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?;

        let StoredPair { public_key, private_key } = stored;
        Ok(Some(ExportedKeyPair { public_key, private_key }))
    }

    fn store(&self, identity: &Identity, pair: &ExportedKeyPair) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let stored = StoredPair {
            public_key: pair.public_key.clone(),
            private_key: pair.private_key.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written pair.
        let path = self.path_for(identity);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, identity: &Identity) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(identity)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
