//! Deterministic import: content-addressed, write-key-less records.

use bytes::Bytes;
use runbox_crypto::Fingerprint;
use runbox_store::RecordStore;
use runbox_types::{CodeFile, FileSet, ReadKey, TypeError, MAX_BODY_SIZE};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};

/// Accepted payload shapes: a bare array of files, or a full `{"files": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Files(Vec<CodeFile>),
    Set(FileSet),
}

impl From<ImportPayload> for FileSet {
    fn from(payload: ImportPayload) -> Self {
        match payload {
            ImportPayload::Files(files) => FileSet::new(files),
            ImportPayload::Set(set) => set,
        }
    }
}

/// Creates records whose read key is derived from the payload bytes.
///
/// The payload is hashed exactly as received, before any parsing, so the same
/// link always lands on the same record and nothing is stored twice.
pub struct Importer {
    records: RecordStore,
    max_payload_bytes: usize,
}

impl Importer {
    pub fn new(records: RecordStore) -> Self {
        Self {
            records,
            max_payload_bytes: MAX_BODY_SIZE,
        }
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Import `payload`, returning the derived read key.
    ///
    /// If a record already exists under the derived key the payload is not
    /// parsed at all.
    pub async fn import(&self, payload: Option<&str>) -> ServerResult<ReadKey> {
        let payload = payload
            .filter(|p| !p.is_empty())
            .ok_or(ServerError::MissingFilesParam)?;
        if payload.len() > self.max_payload_bytes {
            return Err(ServerError::ImportTooLarge {
                size: payload.len(),
                max: self.max_payload_bytes,
            });
        }

        let read_key = Fingerprint::of(payload.as_bytes()).read_key();
        if self.records.has_files(&read_key).await? {
            debug!(%read_key, "import already present");
            return Ok(read_key);
        }

        let files = Self::parse(payload)?;
        self.records
            .put_files(&read_key, Bytes::from(files.to_json()?))
            .await?;
        info!(%read_key, files = files.len(), "imported sandbox");
        Ok(read_key)
    }

    /// Decode and normalize an import payload.
    fn parse(payload: &str) -> ServerResult<FileSet> {
        let decoded: ImportPayload =
            serde_json::from_str(payload).map_err(|e| ServerError::MalformedJson(e.to_string()))?;
        let mut files = FileSet::from(decoded);
        if files.is_empty() {
            return Err(TypeError::EmptyFileSet.into());
        }
        files.validate_names()?;
        files.ensure_active();
        Ok(files)
    }
}

impl std::fmt::Debug for Importer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Importer")
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish_non_exhaustive()
    }
}
