//! Blake3 hashing utilities for stable content fingerprints.
//!
//! Graph fingerprints are used to compare two resolution runs without
//! diffing their full node and edge sets.

/// Incremental hasher over an ordered sequence of string records
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
        }
    }

    /// Feed one record; records are length-prefixed so boundaries matter
    pub fn record(&mut self, record: &str) -> &mut Self {
        self.hasher.update(&(record.len() as u64).to_le_bytes());
        self.hasher.update(record.as_bytes());
        self
    }

    pub fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}
