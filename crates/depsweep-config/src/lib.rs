//! Configuration for depsweep
//!
//! This crate loads the knobs the resolution engine honors (depth limit,
//! worker count, cache location, audit) from `depsweep.toml` and the
//! environment, and validates them before a run starts.

pub mod engine;
pub mod merge;

// Re-export main types
pub use engine::{default_cache_path, CacheConfig, EngineConfig};
pub use merge::{ConfigLoader, ConfigSource};

use depsweep_core::error::DepsweepError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, DepsweepError>;
