//! Key manager resolution order.
//!
//! Covers every combination of remote and local state plus an unreachable
//! remote, and checks which pair wins and where it ends up stored.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "Test helpers")]

use std::sync::{Arc, Mutex};

use quill_core::{
    ApiError, KeyManager, KeyService, KeySource, LocalKeyStore, MemoryKeyStore, ResolvedKeys,
    StorageError, SystemEnv,
};
use quill_crypto::{ExportedKeyPair, KEY_SIZE, KeyPair};
use quill_proto::{Identity, KeyBundle};

/// Key service double with a switchable outage.
#[derive(Clone, Default)]
struct FakeKeyService {
    bundle: Arc<Mutex<KeyBundle>>,
    pushes: Arc<Mutex<Vec<KeyBundle>>>,
    offline: bool,
}

impl FakeKeyService {
    fn holding(pair: &KeyPair) -> Self {
        let exported = pair.export();
        let service = Self::default();
        *service.bundle.lock().unwrap() = KeyBundle::new(exported.public_key, exported.private_key);
        service
    }

    fn offline() -> Self {
        Self { offline: true, ..Self::default() }
    }

    fn pushes(&self) -> Vec<KeyBundle> {
        self.pushes.lock().unwrap().clone()
    }
}

impl KeyService for FakeKeyService {
    async fn fetch_key_bundle(&self) -> Result<KeyBundle, ApiError> {
        if self.offline {
            return Err(ApiError::Unreachable("connection refused".into()));
        }
        Ok(self.bundle.lock().unwrap().clone())
    }

    async fn push_key_bundle(&self, bundle: KeyBundle) -> Result<(), ApiError> {
        if self.offline {
            return Err(ApiError::Unreachable("connection refused".into()));
        }
        *self.bundle.lock().unwrap() = bundle.clone();
        self.pushes.lock().unwrap().push(bundle);
        Ok(())
    }
}

/// Local store whose disk rejects every write.
#[derive(Clone, Default)]
struct ReadOnlyStore;

impl LocalKeyStore for ReadOnlyStore {
    fn load(&self, _: &Identity) -> Result<Option<ExportedKeyPair>, StorageError> {
        Ok(None)
    }

    fn store(&self, _: &Identity, _: &ExportedKeyPair) -> Result<(), StorageError> {
        Err(StorageError::Io("read-only file system".into()))
    }

    fn remove(&self, _: &Identity) -> Result<(), StorageError> {
        Err(StorageError::Io("read-only file system".into()))
    }
}

fn alice() -> Identity {
    Identity::new("alice")
}

async fn resolve(remote: FakeKeyService, local: MemoryKeyStore) -> ResolvedKeys {
    KeyManager::new(alice(), remote, local, SystemEnv).resolve().await
}

fn store_with(pair: &KeyPair) -> MemoryKeyStore {
    let store = MemoryKeyStore::new();
    store.store(&alice(), &pair.export()).unwrap();
    store
}

#[tokio::test]
async fn remote_pair_wins_over_local() {
    let remote_pair = KeyPair::generate([1; KEY_SIZE]);
    let local_pair = KeyPair::generate([2; KEY_SIZE]);
    let remote = FakeKeyService::holding(&remote_pair);
    let local = store_with(&local_pair);

    let resolved = resolve(remote.clone(), local.clone()).await;

    assert_eq!(resolved.source, KeySource::Remote);
    assert_eq!(resolved.key_pair.public_key(), remote_pair.public_key());
    assert_eq!(local.load(&alice()).unwrap(), Some(remote_pair.export()));
    assert!(remote.pushes().is_empty());
}

#[tokio::test]
async fn remote_pair_survives_local_write_failure() {
    let remote_pair = KeyPair::generate([9; KEY_SIZE]);
    let remote = FakeKeyService::holding(&remote_pair);

    let manager = KeyManager::new(alice(), remote.clone(), ReadOnlyStore, SystemEnv);
    let resolved = manager.resolve().await;

    assert_eq!(resolved.source, KeySource::Remote);
    assert_eq!(resolved.key_pair.public_key(), remote_pair.public_key());
    assert!(remote.pushes().is_empty());
}

#[tokio::test]
async fn local_pair_is_pushed_when_remote_empty() {
    let local_pair = KeyPair::generate([2; KEY_SIZE]);
    let remote = FakeKeyService::default();

    let resolved = resolve(remote.clone(), store_with(&local_pair)).await;

    assert_eq!(resolved.source, KeySource::LocalSynced);
    assert_eq!(resolved.key_pair.public_key(), local_pair.public_key());

    let exported = local_pair.export();
    assert_eq!(remote.pushes(), vec![KeyBundle::new(exported.public_key, exported.private_key)]);
}

#[tokio::test]
async fn fresh_pair_is_generated_stored_and_pushed() {
    let remote = FakeKeyService::default();
    let local = MemoryKeyStore::new();

    let resolved = resolve(remote.clone(), local.clone()).await;

    assert_eq!(resolved.source, KeySource::Generated);
    let exported = resolved.key_pair.export();
    assert_eq!(local.load(&alice()).unwrap(), Some(exported.clone()));
    assert_eq!(remote.pushes(), vec![KeyBundle::new(exported.public_key, exported.private_key)]);
}

#[tokio::test]
async fn second_session_reuses_generated_pair() {
    let remote = FakeKeyService::default();
    let local = MemoryKeyStore::new();

    let first = resolve(remote.clone(), local.clone()).await;
    let second = resolve(remote, MemoryKeyStore::new()).await;

    assert_eq!(second.source, KeySource::Remote);
    assert_eq!(second.key_pair.public_key(), first.key_pair.public_key());
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_local() {
    let local_pair = KeyPair::generate([2; KEY_SIZE]);

    let resolved = resolve(FakeKeyService::offline(), store_with(&local_pair)).await;

    assert_eq!(resolved.source, KeySource::LocalFallback);
    assert!(resolved.source.is_degraded());
    assert_eq!(resolved.key_pair.public_key(), local_pair.public_key());
}

#[tokio::test]
async fn unreachable_remote_and_no_local_is_ephemeral() {
    let local = MemoryKeyStore::new();

    let resolved = resolve(FakeKeyService::offline(), local.clone()).await;

    assert_eq!(resolved.source, KeySource::Ephemeral);
    assert_eq!(local.load(&alice()).unwrap(), None);
}

#[tokio::test]
async fn mismatched_remote_bundle_degrades() {
    let a = KeyPair::generate([1; KEY_SIZE]).export();
    let b = KeyPair::generate([2; KEY_SIZE]).export();
    let remote = FakeKeyService::default();
    *remote.bundle.lock().unwrap() = KeyBundle::new(a.public_key, b.private_key);
    let local_pair = KeyPair::generate([3; KEY_SIZE]);

    let resolved = resolve(remote, store_with(&local_pair)).await;

    assert_eq!(resolved.source, KeySource::LocalFallback);
    assert_eq!(resolved.key_pair.public_key(), local_pair.public_key());
}

#[tokio::test]
async fn invalid_local_pair_is_replaced() {
    let local = MemoryKeyStore::new();
    let garbage = ExportedKeyPair { public_key: "not-a-key".into(), private_key: "nope".into() };
    local.store(&alice(), &garbage).unwrap();

    let resolved = resolve(FakeKeyService::default(), local.clone()).await;

    assert_eq!(resolved.source, KeySource::Generated);
    assert_eq!(local.load(&alice()).unwrap(), Some(resolved.key_pair.export()));
}
