//! Utility functions and helpers.
//!
//! Common functionality used across multiple depsweep crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::Fingerprint;
pub use path::normalize_path;
