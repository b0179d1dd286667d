use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// Key → bytes storage with the guarantees of an object bucket.
///
/// All implementations must satisfy these invariants:
/// - `put` replaces the whole value; there are no partial updates.
/// - No operation spans more than one key. Callers that write two keys must
///   handle the second write failing after the first succeeded.
/// - The store never interprets values.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a value. Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Write a value, replacing any previous one.
    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Check whether a key exists without reading its value.
    async fn head(&self, key: &str) -> StoreResult<bool>;
}
