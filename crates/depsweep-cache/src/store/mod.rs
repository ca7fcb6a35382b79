//! Persistence boundary behind the package cache

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::key::{CacheKey, CacheValue};
use crate::CacheResult;

/// Swappable backing store.
///
/// Stores are append-only: `put` on an existing key keeps the first value.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>>;

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()>;

    /// Drop every entry, including anything persisted
    fn clear(&self) -> CacheResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist pending writes
    fn flush(&self) -> CacheResult<()> {
        Ok(())
    }
}
