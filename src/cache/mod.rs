//! Cache layer for upstream observations
//!
//! One [`store::CacheStore`] interface with two implementations: a
//! file-backed JSON store for normal operation and an in-process map for
//! tests and offline use.

pub mod store;

pub use store::{CacheStore, CachedValue, FileStore, MemoryStore};
