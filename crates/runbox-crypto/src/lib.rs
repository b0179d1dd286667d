//! Cryptographic primitives for runbox.
//!
//! Provides random capability key generation backed by the operating system
//! CSPRNG, and SHA-256 content fingerprints used to derive deterministic read
//! keys for imported payloads.
//!
//! Randomness comes from `rand` and hashing from `sha2`; nothing here is hand-rolled.

pub mod fingerprint;
pub mod keygen;

pub use fingerprint::Fingerprint;
pub use keygen::{generate_hex, KeyError, KeyGenerator, OsKeyGenerator, SeededKeyGenerator};
