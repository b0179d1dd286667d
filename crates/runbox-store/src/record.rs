use std::sync::Arc;

use bytes::Bytes;
use runbox_types::{ReadKey, WriteKey};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// `{readKey}/files`
pub fn files_key(read_key: &ReadKey) -> String {
    format!("{read_key}/files")
}

/// `{readKey}/writeKey`
pub fn write_key_key(read_key: &ReadKey) -> String {
    format!("{read_key}/writeKey")
}

/// Sandbox records laid out over a [`BlobStore`].
///
/// Each method touches exactly one key. Record creation is two calls,
/// [`put_files`](Self::put_files) then [`put_write_key`](Self::put_write_key);
/// nothing here pretends they are atomic.
#[derive(Clone)]
pub struct RecordStore {
    blobs: Arc<dyn BlobStore>,
}

impl RecordStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// The serialized file set, exactly as it was stored.
    pub async fn load_files(&self, read_key: &ReadKey) -> StoreResult<Option<Bytes>> {
        self.blobs.get(&files_key(read_key)).await
    }

    pub async fn has_files(&self, read_key: &ReadKey) -> StoreResult<bool> {
        self.blobs.head(&files_key(read_key)).await
    }

    /// Write (or wholly replace) the file set.
    pub async fn put_files(&self, read_key: &ReadKey, body: Bytes) -> StoreResult<()> {
        self.blobs.put(&files_key(read_key), body).await
    }

    /// Store the write key for a record. Called once, at creation.
    pub async fn put_write_key(&self, read_key: &ReadKey, write_key: &WriteKey) -> StoreResult<()> {
        let value = Bytes::copy_from_slice(write_key.as_str().as_bytes());
        self.blobs.put(&write_key_key(read_key), value).await
    }

    /// The stored write key, or `None` for records that never had one.
    pub async fn load_write_key(&self, read_key: &ReadKey) -> StoreResult<Option<WriteKey>> {
        let key = write_key_key(read_key);
        let Some(raw) = self.blobs.get(&key).await? else {
            return Ok(None);
        };
        let text = std::str::from_utf8(&raw).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        WriteKey::parse(text).map(Some).map_err(|e| StoreError::Corrupt {
            key,
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBlobStore;
    use crate::testing::FaultyBlobStore;

    fn read_key() -> ReadKey {
        ReadKey::parse("0123456789abcdef").unwrap()
    }

    fn write_key() -> WriteKey {
        WriteKey::parse(&"ab".repeat(16)).unwrap()
    }

    #[test]
    fn layout_keys() {
        assert_eq!(files_key(&read_key()), "0123456789abcdef/files");
        assert_eq!(write_key_key(&read_key()), "0123456789abcdef/writeKey");
    }

    #[tokio::test]
    async fn two_step_creation() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let records = RecordStore::new(blobs.clone());
        records.put_files(&read_key(), Bytes::from_static(b"{\"files\":[]}")).await.unwrap();
        assert!(records.has_files(&read_key()).await.unwrap());
        assert!(records.load_write_key(&read_key()).await.unwrap().is_none());

        records.put_write_key(&read_key(), &write_key()).await.unwrap();
        assert_eq!(records.load_write_key(&read_key()).await.unwrap(), Some(write_key()));
        assert_eq!(
            blobs.snapshot().get("0123456789abcdef/writeKey").unwrap(),
            &Bytes::from("ab".repeat(16))
        );
    }

    #[tokio::test]
    async fn failure_between_steps_leaves_readable_orphan() {
        let blobs = Arc::new(FaultyBlobStore::failing_suffix(InMemoryBlobStore::new(), "/writeKey"));
        let records = RecordStore::new(blobs.clone());
        records.put_files(&read_key(), Bytes::from_static(b"{}")).await.unwrap();
        assert!(records.put_write_key(&read_key(), &write_key()).await.is_err());
        assert!(records.load_files(&read_key()).await.unwrap().is_some());
        assert!(records.load_write_key(&read_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_write_key_is_reported() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs
            .put("0123456789abcdef/writeKey", Bytes::from_static(b"not-a-key"))
            .await
            .unwrap();
        let records = RecordStore::new(blobs);
        assert!(matches!(
            records.load_write_key(&read_key()).await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
