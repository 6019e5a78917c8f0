//! festsync — sync and caching layer for live competition results.
//!
//! Keeps four collections (results, programs, teams, participants)
//! consistent between an optional remote document backend and a local
//! durable cache. With a backend configured and reachable the store
//! runs in remote mode: writes go to the backend and the in-memory
//! copy follows real-time subscription snapshots. Without one, writes
//! apply immediately and persist to the cache, so the dataset survives
//! restarts offline.
//!
//! ```no_run
//! use festsync::{Config, SyncStore};
//!
//! # async fn run() -> Result<(), festsync::StoreError> {
//! let config = Config::load().map_err(|e| festsync::StoreError::Validation(e.to_string()))?;
//! let store = SyncStore::open(&config).await?;
//! println!("{} results", store.results().len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod scores;
pub mod store;
pub mod transfer;

pub use config::{BackendConfig, Config};
pub use error::StoreError;
pub use models::{
    Collection, Grade, NewParticipant, NewProgram, NewResult, NewTeam, Participant, Place,
    Program, ProgramCategory, ResultEntry, Team,
};
pub use scores::Scoreboard;
pub use store::{SubscriptionHandle, SyncStore};
pub use transfer::{default_export_filename, ExportSnapshot, ImportPayload};
