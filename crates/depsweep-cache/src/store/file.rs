//! JSON file store: an in-memory map loaded on open and written on flush

use dashmap::DashMap;
use depsweep_core::DepsweepError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use super::CacheStore;
use crate::key::{CacheKey, CacheValue};
use crate::CacheResult;

#[derive(Debug)]
pub struct JsonFileStore {
    entries: DashMap<CacheKey, CacheValue>,
    path: PathBuf,
    dirty: AtomicBool,
}

impl JsonFileStore {
    /// Load an existing cache file or start empty.
    ///
    /// A file that cannot be parsed is ignored and will be replaced on the
    /// next flush; a file that cannot be read is an error.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = DashMap::new();

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<(CacheKey, CacheValue)>>(&content) {
                Ok(loaded) => {
                    for (key, value) in loaded {
                        entries.insert(key, value);
                    }
                    debug!(path = %path.display(), entries = entries.len(), "Loaded cache file");
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
                },
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => {
                return Err(DepsweepError::io(
                    format!("Failed to read cache file {}", path.display()),
                    e,
                ))
            },
        }

        Ok(Self {
            entries,
            path,
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> CacheResult<()> {
        let mut entries: Vec<(String, CacheKey, CacheValue)> = self
            .entries
            .iter()
            .map(|entry| {
                let sort_key = entry.key().to_string();
                (sort_key, entry.key().clone(), entry.value().clone())
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let entries: Vec<(CacheKey, CacheValue)> = entries.into_iter().map(|(_, k, v)| (k, v)).collect();

        let content = serde_json::to_string(&entries).map_err(|e| DepsweepError::CacheBackend {
            message: format!("Failed to serialize cache: {}", e),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DepsweepError::io("Failed to create cache directory".to_string(), e))?;
        }

        // Write-then-rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| DepsweepError::io("Failed to write cache file".to_string(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| DepsweepError::io("Failed to replace cache file".to_string(), e))?;
        Ok(())
    }
}

impl CacheStore for JsonFileStore {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        if let dashmap::mapref::entry::Entry::Vacant(slot) = self.entries.entry(key) {
            slot.insert(value);
            self.dirty.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries.clear();
        self.dirty.store(false, Ordering::Release);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DepsweepError::io(
                format!("Failed to delete cache file {}", self.path.display()),
                e,
            )),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn flush(&self) -> CacheResult<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.write() {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        debug!(path = %self.path.display(), entries = self.entries.len(), "Flushed cache file");
        Ok(())
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "Failed to flush cache on drop");
        }
    }
}
