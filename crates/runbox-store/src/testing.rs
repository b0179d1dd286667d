//! Fault injection for exercising partial-write paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Wraps a store and fails every `put` whose key ends with a given suffix.
///
/// Reads always pass through. Counts of attempted puts are kept so tests can
/// assert that nothing touched storage.
#[derive(Debug)]
pub struct FaultyBlobStore<S> {
    inner: S,
    fail_suffix: Option<String>,
    puts: AtomicUsize,
}

impl<S: BlobStore> FaultyBlobStore<S> {
    /// Pass everything through, only counting puts.
    pub fn counting(inner: S) -> Self {
        Self {
            inner,
            fail_suffix: None,
            puts: AtomicUsize::new(0),
        }
    }

    /// Fail puts to keys ending in `suffix`.
    pub fn failing_suffix(inner: S, suffix: impl Into<String>) -> Self {
        Self {
            inner,
            fail_suffix: Some(suffix.into()),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls attempted, including failed ones.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for FaultyBlobStore<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(suffix) = &self.fail_suffix {
            if key.ends_with(suffix.as_str()) {
                return Err(StoreError::Backend(format!("injected failure writing {key}")));
            }
        }
        self.inner.put(key, value).await
    }

    async fn head(&self, key: &str) -> StoreResult<bool> {
        self.inner.head(key).await
    }
}
