use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use runbox_types::{FileSet, ReadKey, StoreResponse, WriteKey};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::KeyCache;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::examples;
use crate::location::PageLocation;
use crate::transport::StoreTransport;

/// Save lifecycle of the current identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No write key held for the current page.
    Unsaved,
    Saving,
    /// Write key held and the last edit is persisted.
    Saved,
    /// Write key held, edits since the last save.
    Dirty,
}

/// Result of a save that reached the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOutcome {
    Saved,
    Created { read_key: ReadKey, forked: bool },
}

impl StoreOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Saved => "Changes saved",
            Self::Created { .. } => "New sandbox created",
        }
    }

    pub fn is_new_sandbox(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// What a page starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialState {
    pub files: FileSet,
    /// A write key is held, so saves update in place.
    pub allow_save: bool,
    /// The files came from a stored record.
    pub allow_fork: bool,
}

struct EngineState {
    location: PageLocation,
    cache: KeyCache,
    save_enabled: bool,
    state: SyncState,
    /// Bumped on every edit; a save settles to `Saved` only if none landed
    /// while it was in flight.
    edits: u64,
    last_fork: Option<Instant>,
}

impl EngineState {
    fn held_write_key(&self) -> Option<(ReadKey, WriteKey)> {
        let read_key = self.location.read_key()?;
        let write_key = self.cache.write_key(&read_key)?.clone();
        Some((read_key, write_key))
    }

    fn settle(&mut self, edits: u64) {
        self.state = if self.edits == edits {
            SyncState::Saved
        } else {
            SyncState::Dirty
        };
    }

    fn unsettle(&mut self) {
        self.state = if self.held_write_key().is_some() {
            SyncState::Dirty
        } else {
            SyncState::Unsaved
        };
    }

    fn fork_remaining(&self, cooldown: Duration) -> Option<Duration> {
        let elapsed = self.last_fork?.elapsed();
        cooldown.checked_sub(elapsed).filter(|d| !d.is_zero())
    }
}

enum Target {
    Update { read_key: ReadKey, write_key: WriteKey },
    Create { issued_from: String },
}

/// Client synchronization engine.
///
/// Owns the page identity and the key cache. Cloning is cheap and every clone
/// drives the same state. The state lock is never held across a network
/// call, so an edit can always be recorded while a save is in flight.
/// Saves themselves queue on a separate async lock and run one at a time.
pub struct SyncEngine<T> {
    transport: Arc<T>,
    config: SyncConfig,
    state: Arc<Mutex<EngineState>>,
    saving: Arc<tokio::sync::Mutex<()>>,
}

impl<T> Clone for SyncEngine<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config,
            state: self.state.clone(),
            saving: self.saving.clone(),
        }
    }
}

impl<T: StoreTransport> SyncEngine<T> {
    pub fn new(transport: T, location: PageLocation) -> Self {
        Self::from_arc(Arc::new(transport), location)
    }

    pub fn from_arc(transport: Arc<T>, location: PageLocation) -> Self {
        Self {
            transport,
            config: SyncConfig::default(),
            state: Arc::new(Mutex::new(EngineState {
                location,
                cache: KeyCache::default(),
                save_enabled: false,
                state: SyncState::Unsaved,
                edits: 0,
                last_fork: None,
            })),
            saving: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn with_cache(self, cache: KeyCache) -> Self {
        {
            let mut st = self.lock();
            st.cache = cache;
            st.unsettle();
        }
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("lock poisoned")
    }

    pub fn location(&self) -> PageLocation {
        self.lock().location.clone()
    }

    /// Navigate. Saves already in flight keep their original target.
    pub fn set_location(&self, location: PageLocation) {
        let mut st = self.lock();
        st.location = location;
        st.unsettle();
    }

    pub fn current_read_key(&self) -> Option<ReadKey> {
        self.lock().location.read_key()
    }

    pub fn cache(&self) -> KeyCache {
        self.lock().cache.clone()
    }

    pub fn sync_state(&self) -> SyncState {
        self.lock().state
    }

    pub fn save_enabled(&self) -> bool {
        self.lock().save_enabled
    }

    pub fn set_save_enabled(&self, enabled: bool) {
        self.lock().save_enabled = enabled;
    }

    /// Record that the content changed since the last save.
    pub fn mark_edited(&self) {
        let mut st = self.lock();
        st.edits += 1;
        if st.state == SyncState::Saved {
            st.state = SyncState::Dirty;
        }
    }

    /// Time left before another fork is allowed, if any.
    pub fn fork_cooldown_remaining(&self) -> Option<Duration> {
        self.lock().fork_remaining(self.config.fork_cooldown)
    }

    /// Resolve the page to its starting files.
    ///
    /// A `/store/{R}` page loads the record; if the record is gone the page
    /// falls back to a built-in example like any other path. Transport
    /// failures other than not-found are returned.
    pub async fn retrieve(&self) -> SyncResult<InitialState> {
        let location = self.location();
        if let Some(read_key) = location.read_key() {
            if let Some(files) = self.transport.fetch(&read_key).await? {
                let mut st = self.lock();
                let allow_save = st.cache.write_key(&read_key).is_some();
                st.state = if allow_save {
                    SyncState::Saved
                } else {
                    SyncState::Unsaved
                };
                debug!(%read_key, allow_save, "loaded sandbox");
                return Ok(InitialState {
                    files,
                    allow_save,
                    allow_fork: true,
                });
            }
            warn!(%read_key, "sandbox not found, using example");
        }
        Ok(InitialState {
            files: examples::for_path(location.path()),
            allow_save: true,
            allow_fork: false,
        })
    }

    /// Persist `files`.
    ///
    /// Returns `Ok(None)` when nothing was sent: saving is disabled, or the
    /// payload equals the last one this client saved for the current read
    /// key. With `fork`, or when no write key is held, a new sandbox is
    /// created and the page moves to it.
    ///
    /// A call made while another save is in flight waits for it and then
    /// decides against the state that save left behind.
    pub async fn store(&self, files: &FileSet, fork: bool) -> SyncResult<Option<StoreOutcome>> {
        let body = files.to_json()?;
        let _turn = self.saving.lock().await;
        let (target, edits) = {
            let mut st = self.lock();
            if !st.save_enabled {
                return Ok(None);
            }
            if fork {
                if let Some(remaining) = st.fork_remaining(self.config.fork_cooldown) {
                    return Err(SyncError::ForkCooldown { remaining });
                }
            }

            let held = if fork { None } else { st.held_write_key() };
            let target = match held {
                Some((read_key, write_key)) => {
                    if st.cache.last_payload(&read_key) == Some(body.as_str()) {
                        debug!(%read_key, "skipping save, no changes");
                        if st.state == SyncState::Dirty {
                            st.state = SyncState::Saved;
                        }
                        return Ok(None);
                    }
                    Target::Update { read_key, write_key }
                }
                None => Target::Create {
                    issued_from: st.location.path().to_owned(),
                },
            };
            st.state = SyncState::Saving;
            (target, st.edits)
        };

        match target {
            Target::Update { read_key, write_key } => {
                self.update(read_key, write_key, body, edits).await
            }
            Target::Create { issued_from } => self.create(issued_from, body, fork, edits).await,
        }
    }

    async fn update(
        &self,
        read_key: ReadKey,
        write_key: WriteKey,
        body: String,
        edits: u64,
    ) -> SyncResult<Option<StoreOutcome>> {
        debug!(%read_key, "saving changes");
        let result = self.transport.update(&read_key, &write_key, &body).await;

        let mut st = self.lock();
        let current = st.location.read_key().as_ref() == Some(&read_key);
        match result {
            Ok(()) => {
                if current {
                    st.cache.record_save(&read_key, body);
                    st.settle(edits);
                } else {
                    debug!(%read_key, "page moved during save, cache untouched");
                }
                Ok(Some(StoreOutcome::Saved))
            }
            Err(e) => {
                warn!(%read_key, error = %e, "failed to save");
                if current {
                    st.unsettle();
                }
                Err(e)
            }
        }
    }

    async fn create(
        &self,
        issued_from: String,
        body: String,
        fork: bool,
        edits: u64,
    ) -> SyncResult<Option<StoreOutcome>> {
        debug!(fork, "creating new sandbox");
        let result = self.transport.create_new(&body).await;

        let mut st = self.lock();
        let unmoved = st.location.path() == issued_from;
        match result {
            Ok(StoreResponse { read_key, write_key }) => {
                st.cache.record_create(read_key.clone(), write_key, body);
                if unmoved {
                    st.location.push_store(&read_key);
                    st.settle(edits);
                } else {
                    debug!(%read_key, "page moved during create, location kept");
                }
                if fork {
                    st.last_fork = Some(Instant::now());
                }
                info!(%read_key, fork, "new sandbox created");
                Ok(Some(StoreOutcome::Created { read_key, forked: fork }))
            }
            Err(e) => {
                warn!(fork, error = %e, "failed to create sandbox");
                if unmoved {
                    st.unsettle();
                }
                Err(e)
            }
        }
    }
}

impl<T> std::fmt::Debug for SyncEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
