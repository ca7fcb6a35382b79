//! Engine configuration and its `depsweep.toml` representation

use camino::Utf8PathBuf;
use depsweep_core::DepsweepError;
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Where resolved candidate lists are memoized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheConfig {
    /// Process-local, discarded after the run
    Memory,
    /// JSON file reused across runs
    File { path: Utf8PathBuf },
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory
    }
}

/// Knobs the resolution engine honors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum recursion depth below the roots; `None` is unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Concurrent resolver calls
    pub max_workers: usize,
    /// Clear the cache before resolving
    pub clear_cache: bool,
    /// Query the vulnerability source after resolving
    pub audit: bool,
    /// Concurrent vulnerability queries
    pub audit_workers: usize,
    /// Retries for a resolver whose backend is unavailable
    pub max_retries: u32,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            max_depth: None,
            max_workers: cores * 2,
            clear_cache: false,
            audit: false,
            audit_workers: cores * 2,
            max_retries: 2,
            cache: CacheConfig::Memory,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_clear_cache(mut self, clear_cache: bool) -> Self {
        self.clear_cache = clear_cache;
        self
    }

    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Parse a `depsweep.toml` document; missing fields keep their defaults
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| DepsweepError::ConfigParse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| DepsweepError::ConfigParse {
            message: format!("TOML serialization error: {}", e),
        })
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_workers == 0 {
            return Err(DepsweepError::ConfigValidation {
                field: "max_workers".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.audit_workers == 0 {
            return Err(DepsweepError::ConfigValidation {
                field: "audit_workers".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }
        if let CacheConfig::File { path } = &self.cache {
            if path.as_str().is_empty() {
                return Err(DepsweepError::ConfigValidation {
                    field: "cache.path".to_string(),
                    reason: "cache path must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Default location of the persistent cache file
pub fn default_cache_path() -> ConfigResult<Utf8PathBuf> {
    let cache_dir = dirs::cache_dir().ok_or_else(|| DepsweepError::ConfigValidation {
        field: "cache.path".to_string(),
        reason: "Could not determine the user cache directory".to_string(),
    })?;

    let cache_dir = Utf8PathBuf::try_from(cache_dir).map_err(|e| DepsweepError::ConfigValidation {
        field: "cache.path".to_string(),
        reason: format!("Invalid cache directory path: {}", e),
    })?;

    Ok(cache_dir.join("depsweep").join("cache.json"))
}
