//! Shared state for the HTTP handlers.

use std::sync::Arc;

use runbox_store::{BlobStore, InMemoryBlobStore, RecordStore};
use runbox_types::MAX_BODY_SIZE;

use crate::gateway::Gateway;
use crate::import::Importer;

/// The shared app state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Random-key create, read and authorized update.
    pub gateway: Arc<Gateway>,
    /// Content-addressed import of shared payloads.
    pub importer: Arc<Importer>,
}

impl AppState {
    /// Build state over any blob store with the given payload ceiling.
    pub fn new(blobs: Arc<dyn BlobStore>, max_body_bytes: usize) -> Self {
        let records = RecordStore::new(blobs);
        Self {
            gateway: Arc::new(Gateway::new(records.clone()).with_max_body_bytes(max_body_bytes)),
            importer: Arc::new(Importer::new(records).with_max_payload_bytes(max_body_bytes)),
        }
    }

    /// Fresh in-memory state with the default ceiling.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBlobStore::new()), MAX_BODY_SIZE)
    }
}
