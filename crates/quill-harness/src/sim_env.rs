//! Seeded environment for deterministic tests.

use std::sync::{Arc, Mutex, PoisonError};

use quill_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Default seed for [`SimEnv::new`].
pub const DEFAULT_SEED: u64 = 0x5155_494c_4c;

/// [`Environment`] backed by a seeded ChaCha20 stream.
///
/// Clones share the stream, so a cloned env keeps producing fresh bytes
/// rather than replaying the same ones.
#[derive(Debug, Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Environment with the default seed.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Environment with a specific seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
