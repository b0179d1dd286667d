//! Client synchronization for runbox sandboxes.
//!
//! Keeps an editor's file set in step with the storage gateway: edits are
//! debounced into saves, saves with nothing new are skipped, and a fork moves
//! the page to a freshly created identity. The engine is transport-agnostic;
//! [`HttpTransport`] talks to a real gateway.
//!
//! Saves from one client are strictly sequential. Writers on other devices
//! are last-writer-wins with no conflict detection.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod engine;
pub mod error;
pub mod examples;
pub mod http;
pub mod location;
pub mod runner;
pub mod session;
pub mod testing;
pub mod transport;

pub use cache::{CacheEntry, KeyCache};
pub use config::SyncConfig;
pub use debounce::Debouncer;
pub use editor::{BufferEditor, Editor};
pub use engine::{InitialState, StoreOutcome, SyncEngine, SyncState};
pub use error::{SyncError, SyncResult};
pub use http::HttpTransport;
pub use location::PageLocation;
pub use runner::{CodeRunner, RunEvent, RunOutput};
pub use session::{SaveStatus, Session};
pub use transport::StoreTransport;
