use std::collections::HashMap;
use std::path::Path;

use runbox_types::{ReadKey, WriteKey};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// What this client remembers about one read key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Present only for records this client created.
    pub write_key: Option<WriteKey>,
    /// Last payload the server acknowledged.
    pub last_payload: Option<String>,
}

/// Per-client key cache: read key to write key and last saved payload.
///
/// Never shared across clients. Entries are only written after a save
/// succeeds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCache {
    entries: HashMap<ReadKey, CacheEntry>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, read_key: &ReadKey) -> Option<&CacheEntry> {
        self.entries.get(read_key)
    }

    pub fn write_key(&self, read_key: &ReadKey) -> Option<&WriteKey> {
        self.get(read_key).and_then(|e| e.write_key.as_ref())
    }

    pub fn last_payload(&self, read_key: &ReadKey) -> Option<&str> {
        self.get(read_key).and_then(|e| e.last_payload.as_deref())
    }

    /// Remember `payload` as the latest saved content of `read_key`.
    pub fn record_save(&mut self, read_key: &ReadKey, payload: String) {
        self.entries.entry(read_key.clone()).or_default().last_payload = Some(payload);
    }

    /// Remember a freshly created record.
    pub fn record_create(&mut self, read_key: ReadKey, write_key: WriteKey, payload: String) {
        self.entries.insert(
            read_key,
            CacheEntry {
                write_key: Some(write_key),
                last_payload: Some(payload),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load from a JSON file. A missing file is an empty cache.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        match std::fs::read(path.as_ref()) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_key() -> ReadKey {
        ReadKey::parse("0123456789abcdef").unwrap()
    }

    fn write_key() -> WriteKey {
        WriteKey::parse(&"c".repeat(32)).unwrap()
    }

    #[test]
    fn record_save_keeps_write_key() {
        let mut cache = KeyCache::new();
        cache.record_create(read_key(), write_key(), "a".into());
        cache.record_save(&read_key(), "b".into());
        assert_eq!(cache.write_key(&read_key()), Some(&write_key()));
        assert_eq!(cache.last_payload(&read_key()), Some("b"));
    }

    #[test]
    fn save_without_create_has_no_write_key() {
        let mut cache = KeyCache::new();
        cache.record_save(&read_key(), "a".into());
        assert!(cache.write_key(&read_key()).is_none());
    }

    #[test]
    fn persists_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keys.json");
        assert!(KeyCache::load(&path).unwrap().is_empty());

        let mut cache = KeyCache::new();
        cache.record_create(read_key(), write_key(), r#"{"files":[]}"#.into());
        cache.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["0123456789abcdef"]["writeKey"], "c".repeat(32));

        assert_eq!(KeyCache::load(&path).unwrap(), cache);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "{").unwrap();
        assert!(KeyCache::load(&path).is_err());
    }
}
