use std::sync::Mutex;

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use runbox_types::{ReadKey, WriteKey};

/// Errors from key generation.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The random source could not supply entropy.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Source of unguessable identifiers.
///
/// Implementors only supply random bytes; hex encoding and key sizing are
/// shared. A failure means the enclosing request must fail with an internal
/// error; it is never retried with a weaker source.
pub trait KeyGenerator: Send + Sync {
    /// Fill `dest` with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), KeyError>;

    /// Produce exactly `len` lowercase hex characters.
    ///
    /// Bytes are generated for `ceil(len / 2)` and the encoding is truncated,
    /// so odd lengths drop the final nibble.
    fn generate(&self, len: usize) -> Result<String, KeyError> {
        let mut bytes = vec![0u8; len.div_ceil(2)];
        self.fill(&mut bytes)?;
        let mut out = hex::encode(bytes);
        out.truncate(len);
        Ok(out)
    }

    /// A fresh 64-bit read key.
    fn read_key(&self) -> Result<ReadKey, KeyError> {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes)?;
        Ok(ReadKey::from_bytes(bytes))
    }

    /// A fresh 128-bit write key.
    fn write_key(&self) -> Result<WriteKey, KeyError> {
        let mut bytes = [0u8; 16];
        self.fill(&mut bytes)?;
        Ok(WriteKey::from_bytes(bytes))
    }
}

/// Key generator backed by the operating system CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsKeyGenerator;

impl KeyGenerator for OsKeyGenerator {
    fn fill(&self, dest: &mut [u8]) -> Result<(), KeyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| KeyError::EntropyUnavailable(e.to_string()))
    }
}

/// Deterministic generator for fixtures and tests. Never use for real keys.
pub struct SeededKeyGenerator {
    rng: Mutex<StdRng>,
}

impl SeededKeyGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl KeyGenerator for SeededKeyGenerator {
    fn fill(&self, dest: &mut [u8]) -> Result<(), KeyError> {
        self.rng.lock().expect("lock poisoned").fill_bytes(dest);
        Ok(())
    }
}

impl std::fmt::Debug for SeededKeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededKeyGenerator").finish_non_exhaustive()
    }
}

/// `len` hex characters from the operating system CSPRNG.
pub fn generate_hex(len: usize) -> Result<String, KeyError> {
    OsKeyGenerator.generate(len)
}
