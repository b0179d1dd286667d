//! In-process [`StoreTransport`] for exercising the engine without a server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use runbox_types::{FileSet, ReadKey, StoreResponse, WriteKey};
use tokio::sync::Notify;

use crate::error::{SyncError, SyncResult};
use crate::transport::StoreTransport;

#[derive(Default)]
struct Record {
    write_key: Option<WriteKey>,
    body: String,
}

/// Gateway semantics over a map, with call counters, failure injection and
/// an optional gate that holds updates until released.
#[derive(Default)]
pub struct MemoryTransport {
    records: Mutex<HashMap<ReadKey, Record>>,
    next_id: AtomicU64,
    creates: AtomicUsize,
    updates: AtomicUsize,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, as if created elsewhere or imported.
    pub fn insert(&self, read_key: ReadKey, write_key: Option<WriteKey>, files: &FileSet) -> SyncResult<()> {
        let body = files.to_json()?;
        self.records
            .lock()
            .expect("lock poisoned")
            .insert(read_key, Record { write_key, body });
        Ok(())
    }

    /// Stored body for `read_key`.
    pub fn body(&self, read_key: &ReadKey) -> Option<String> {
        self.records
            .lock()
            .expect("lock poisoned")
            .get(read_key)
            .map(|r| r.body.clone())
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Total network writes.
    pub fn write_count(&self) -> usize {
        self.create_count() + self.update_count()
    }

    /// Make every call fail with a 500 until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Hold updates until [`Notify::notify_one`] is called on the returned handle.
    pub fn hold_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().expect("lock poisoned") = Some(gate.clone());
        gate
    }

    fn check_failing(&self) -> SyncResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 500,
                body: "Internal server error".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransport for MemoryTransport {
    async fn fetch(&self, read_key: &ReadKey) -> SyncResult<Option<FileSet>> {
        self.check_failing()?;
        match self.body(read_key) {
            Some(body) => Ok(Some(FileSet::from_json(body.as_bytes())?)),
            None => Ok(None),
        }
    }

    async fn create_new(&self, body: &str) -> SyncResult<StoreResponse> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let read_key = ReadKey::parse(&format!("{id:016x}"))?;
        let write_key = WriteKey::parse(&format!("{id:032x}"))?;
        self.records.lock().expect("lock poisoned").insert(
            read_key.clone(),
            Record {
                write_key: Some(write_key.clone()),
                body: body.to_owned(),
            },
        );
        Ok(StoreResponse { read_key, write_key })
    }

    async fn update(&self, read_key: &ReadKey, write_key: &WriteKey, body: &str) -> SyncResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().expect("lock poisoned").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failing()?;
        let mut records = self.records.lock().expect("lock poisoned");
        match records.get_mut(read_key) {
            Some(r) if r.write_key.as_ref() == Some(write_key) => {
                r.body = body.to_owned();
                Ok(())
            }
            _ => Err(SyncError::Status {
                status: 403,
                body: "Unauthorized - wrong writeKey".into(),
            }),
        }
    }
}
