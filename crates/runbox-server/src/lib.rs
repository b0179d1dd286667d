//! HTTP object store gateway for runbox.
//!
//! Maps public read keys to stored file sets and guards every mutation behind
//! a write key issued once at creation. There are no accounts: holding the
//! write key *is* the authorization. A second, deterministic path imports a
//! self-contained payload under a read key derived from its SHA-256, so the
//! same shared link never allocates storage twice.
//!
//! # HTTP Surface
//!
//! | Route                          | Result                                   |
//! |--------------------------------|------------------------------------------|
//! | `GET /store/{R}`               | 200 stored JSON, or 404                  |
//! | `POST /store/new`              | 201 `{readKey, writeKey}`                |
//! | `POST /store/{R}?writeKey={W}` | 200 `ok`; 401 no key; 403 wrong/no key   |
//! | `GET /new?files={payload}`     | 302 to `/store/{derived R}`; 400 on bad payload |
//! | `GET /health`, `GET /info`     | liveness and version                     |

pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod import;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use gateway::Gateway;
pub use import::Importer;
pub use router::build_router;
pub use server::RunboxServer;
pub use state::AppState;
