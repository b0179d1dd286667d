use std::sync::Arc;

use async_trait::async_trait;
use runbox_types::{FileSet, ReadKey, StoreResponse, WriteKey};

use crate::error::SyncResult;

/// The three gateway calls the engine needs.
///
/// `body` arguments are already-serialized file sets; the engine serializes
/// once so the bytes sent are the bytes compared for change detection.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// `None` when the record does not exist.
    async fn fetch(&self, read_key: &ReadKey) -> SyncResult<Option<FileSet>>;

    async fn create_new(&self, body: &str) -> SyncResult<StoreResponse>;

    async fn update(&self, read_key: &ReadKey, write_key: &WriteKey, body: &str) -> SyncResult<()>;
}

#[async_trait]
impl<T: StoreTransport + ?Sized> StoreTransport for Arc<T> {
    async fn fetch(&self, read_key: &ReadKey) -> SyncResult<Option<FileSet>> {
        (**self).fetch(read_key).await
    }

    async fn create_new(&self, body: &str) -> SyncResult<StoreResponse> {
        (**self).create_new(body).await
    }

    async fn update(&self, read_key: &ReadKey, write_key: &WriteKey, body: &str) -> SyncResult<()> {
        (**self).update(read_key, write_key, body).await
    }
}
