use serde::{Deserialize, Serialize};

use crate::keys::{ReadKey, WriteKey};

/// Ceiling on a stored file-set payload, in bytes.
pub const MAX_BODY_SIZE: usize = 10 * 1024;

/// HTTP endpoint paths.
pub mod endpoints {
    use crate::keys::ReadKey;

    /// Prefix for record reads and writes: `/store/{readKey}` and `/store/new`.
    pub const STORE: &str = "/store";
    /// Path segment that requests a fresh record.
    pub const STORE_NEW_SEGMENT: &str = "new";
    /// Deterministic import: `/new?files=...`.
    pub const IMPORT: &str = "/new";
    pub const HEALTH: &str = "/health";
    pub const INFO: &str = "/info";
    /// Query parameter carrying the write key on updates.
    pub const WRITE_KEY_PARAM: &str = "writeKey";
    /// Query parameter carrying the import payload.
    pub const FILES_PARAM: &str = "files";

    /// `/store/{readKey}`
    pub fn store_path(read_key: &ReadKey) -> String {
        format!("{STORE}/{read_key}")
    }
}

/// Body of a successful `POST /store/new`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub read_key: ReadKey,
    pub write_key: WriteKey,
}

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
