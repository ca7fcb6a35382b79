//! Package cache for depsweep
//!
//! This crate deduplicates external resolver work. [`PackageCache`] runs at
//! most one computation per key at a time and memoizes successful results
//! in a [`CacheStore`]. Entries are append-only; [`PackageCache::clear`] is
//! the only way to invalidate them.

pub mod key;
pub mod package;
pub mod store;

// Re-export main types
pub use key::{CacheKey, CacheValue};
pub use package::{CacheStats, PackageCache};
pub use store::{CacheStore, JsonFileStore, MemoryStore};

use depsweep_core::error::DepsweepError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, DepsweepError>;
