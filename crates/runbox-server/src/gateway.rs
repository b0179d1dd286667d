use std::sync::Arc;

use bytes::Bytes;
use runbox_crypto::{KeyGenerator, OsKeyGenerator};
use runbox_store::RecordStore;
use runbox_types::{FileSet, ReadKey, StoreResponse, MAX_BODY_SIZE};
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};

/// Object store gateway: read by read key, create with fresh keys, update
/// with the matching write key.
///
/// Stateless apart from its storage handle; every call is independent. Bodies
/// are validated but stored verbatim, so a fetch returns the exact bytes that
/// were last written.
pub struct Gateway {
    records: RecordStore,
    keys: Arc<dyn KeyGenerator>,
    max_body_bytes: usize,
}

impl Gateway {
    pub fn new(records: RecordStore) -> Self {
        Self {
            records,
            keys: Arc::new(OsKeyGenerator),
            max_body_bytes: MAX_BODY_SIZE,
        }
    }

    /// Replace the random source used for new keys.
    pub fn with_key_generator(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Check an upload before any storage I/O.
    ///
    /// Order: content type, then size, then JSON shape and unique names.
    pub fn validate_upload(&self, content_type: Option<&str>, body: &[u8]) -> ServerResult<FileSet> {
        if !content_type.is_some_and(|ct| ct.contains("application/json")) {
            return Err(ServerError::InvalidContentType);
        }
        if body.len() > self.max_body_bytes {
            return Err(ServerError::PayloadTooLarge {
                size: body.len(),
                max: self.max_body_bytes,
            });
        }
        let files: FileSet =
            serde_json::from_slice(body).map_err(|e| ServerError::MalformedJson(e.to_string()))?;
        files.validate_names()?;
        Ok(files)
    }

    /// Stored file set for `read_key`, byte for byte.
    pub async fn fetch(&self, read_key: &str) -> ServerResult<Bytes> {
        let Ok(read_key) = ReadKey::parse(read_key) else {
            return Err(ServerError::NotFound);
        };
        self.records
            .load_files(&read_key)
            .await?
            .ok_or(ServerError::NotFound)
    }

    /// Store `body` under a fresh read key and return both keys.
    ///
    /// Two writes, files first and write key second. If the second fails the
    /// record stays readable but can never be written again; that is logged
    /// and surfaced as an error, not retried, since retrying could allocate a
    /// second read key for the same upload.
    pub async fn create_new(&self, content_type: Option<&str>, body: Bytes) -> ServerResult<StoreResponse> {
        let files = self.validate_upload(content_type, &body)?;
        let read_key = self.keys.read_key()?;
        let write_key = self.keys.write_key()?;

        self.records.put_files(&read_key, body).await?;
        if let Err(source) = self.records.put_write_key(&read_key, &write_key).await {
            error!(
                %read_key,
                error = %source,
                "write key not persisted; record is orphaned and permanently read-only"
            );
            return Err(ServerError::StorageInconsistency {
                read_key: read_key.to_string(),
                source,
            });
        }

        info!(%read_key, files = files.len(), "created sandbox");
        Ok(StoreResponse { read_key, write_key })
    }

    /// Replace the file set of an existing record.
    ///
    /// Upload checks run first, then the write key: missing is 401, absent on
    /// the record or different is 403.
    pub async fn update(
        &self,
        read_key: &str,
        write_key: Option<&str>,
        content_type: Option<&str>,
        body: Bytes,
    ) -> ServerResult<()> {
        self.validate_upload(content_type, &body)?;
        let supplied = write_key
            .filter(|k| !k.is_empty())
            .ok_or(ServerError::MissingWriteKey)?;

        // A malformed read key can never have been issued a write key.
        let Ok(read_key) = ReadKey::parse(read_key) else {
            warn!(read_key, "update rejected: malformed read key");
            return Err(ServerError::NoWriteKey);
        };
        let Some(stored) = self.records.load_write_key(&read_key).await? else {
            warn!(%read_key, "update rejected: record has no write key");
            return Err(ServerError::NoWriteKey);
        };
        if !stored.matches(supplied) {
            warn!(%read_key, "update rejected: write key mismatch");
            return Err(ServerError::WrongWriteKey);
        }

        self.records.put_files(&read_key, body).await?;
        debug!(%read_key, "saved changes");
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
