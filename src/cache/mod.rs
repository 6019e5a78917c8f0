//! Local durable cache.
//!
//! This module provides the `CacheManager` for persisting the last
//! known snapshot of each collection, plus the authentication flag, as
//! JSON files. The cache is a non-authoritative warm-start mirror: it
//! is read once at startup and never consulted for freshness.

pub mod manager;

pub use manager::{CacheError, CacheManager, CachedData};
