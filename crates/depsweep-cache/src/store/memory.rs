//! In-memory store

use dashmap::DashMap;

use super::CacheStore;
use crate::key::{CacheKey, CacheValue};
use crate::CacheResult;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, CacheValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        self.entries.entry(key).or_insert(value);
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsweep_core::{Package, PackageIdentity, Version, VersionSpec};

    fn key(name: &str) -> CacheKey {
        CacheKey::candidates(PackageIdentity::new("pip", name), VersionSpec::any())
    }

    fn value(major: u64) -> CacheValue {
        CacheValue::Candidates(vec![Package::new(
            PackageIdentity::new("pip", "six"),
            Version::new(major, 0, 0),
        )])
    }

    #[test]
    fn test_put_and_get() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.get(&key("six")).unwrap().is_none());

        store.put(key("six"), value(1)).unwrap();
        assert_eq!(store.get(&key("six")).unwrap(), Some(value(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_never_overwrites() {
        let store = MemoryStore::new();
        store.put(key("six"), value(1)).unwrap();
        store.put(key("six"), value(2)).unwrap();
        assert_eq!(store.get(&key("six")).unwrap(), Some(value(1)));
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        store.put(key("a"), value(1)).unwrap();
        store.put(key("b"), value(1)).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
