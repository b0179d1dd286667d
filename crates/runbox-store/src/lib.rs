//! Blob storage for runbox sandboxes.
//!
//! The durable layer is deliberately dumb: a key → bytes map with `get`,
//! `put`, and `head`, no transactions, and no cross-key atomicity. This is
//! the shape of an object bucket, and the gateway is written against nothing
//! stronger.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`]: `HashMap`-based store for tests and local runs
//! - [`FsBlobStore`]: one file per key under a root directory
//! - [`testing::FaultyBlobStore`]: wrapper that fails selected writes
//!
//! # Record Layout
//!
//! [`RecordStore`] maps a sandbox onto two keys:
//!
//! - `{readKey}/files`: the serialized file set, stored verbatim
//! - `{readKey}/writeKey`: the raw write key (absent for imported records)
//!
//! Creating a record is two separate puts. They are exposed as two distinct
//! fallible steps so the gap between them is visible to callers and tests.

pub mod error;
pub mod fs;
pub mod memory;
pub mod record;
pub mod testing;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use record::{files_key, write_key_key, RecordStore};
pub use traits::BlobStore;
