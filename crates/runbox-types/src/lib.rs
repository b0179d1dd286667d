//! Foundation types for runbox.
//!
//! A runbox sandbox is a small multi-file code project stored behind a
//! shareable link. Every other runbox crate depends on `runbox-types`.
//!
//! # Key Types
//!
//! - [`CodeFile`]: a named file with its text and focus counter
//! - [`FileSet`]: the ordered files of one sandbox; the active file is the
//!   one with the maximum `activeIndex`
//! - [`ReadKey`]: 16 hex characters, the public identifier of a sandbox
//! - [`WriteKey`]: 32 hex characters, the bearer capability to mutate it
//! - [`StoreResponse`]: the `{readKey, writeKey}` pair returned on creation

pub mod error;
pub mod file;
pub mod keys;
pub mod wire;

pub use error::TypeError;
pub use file::{CodeFile, FileSet};
pub use keys::{ReadKey, WriteKey};
pub use wire::{endpoints, HealthResponse, StoreResponse, MAX_BODY_SIZE};
