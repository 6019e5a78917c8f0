//! Library error taxonomy.

use thiserror::Error;

use crate::backend::BackendError;
use crate::cache::CacheError;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A create/update/delete was rejected by the backend. Nothing was
    /// applied locally; there is no retry.
    #[error("backend write failed: {0}")]
    Backend(#[from] BackendError),

    /// Malformed import payload. The store is left unchanged.
    #[error("invalid payload: {0}")]
    Parse(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An entity rejected at the sync engine boundary.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Subscriptions are only valid in remote mode.
    #[error("no backend configured")]
    NoBackend,
}
