//! Wiring for a complete simulated chat client.

use quill_app::{ChatConfig, Runtime};
use quill_core::{KeyManager, MemoryKeyStore};
use quill_proto::Identity;

use crate::{DriverHandle, SimBackend, SimDriver, SimEnv, SimHub, SimSession};

/// Production runtime instantiated over the simulation collaborators.
pub type SimRuntime = Runtime<SimDriver, SimHub, SimSession, SimSession, MemoryKeyStore, SimEnv>;

/// A chat client of `backend` for `config.identity`, plus its script handle.
///
/// `local` is the device's key store; pass the same store to simulate the
/// same browser signing in again.
pub fn sim_client(
    backend: &SimBackend,
    config: ChatConfig,
    local: MemoryKeyStore,
    seed: u64,
) -> (SimRuntime, DriverHandle) {
    let identity: Identity = config.identity.clone();
    let env = SimEnv::with_seed(seed);
    let session = backend.session(&identity);
    let keys = KeyManager::new(identity.clone(), session.clone(), local, env.clone());
    let (driver, handle) = SimDriver::new();

    let runtime = Runtime::new(config, driver, backend.hub(&identity), session, keys, env);
    (runtime, handle)
}
