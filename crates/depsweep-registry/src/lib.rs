//! Ecosystem resolvers for depsweep
//!
//! This crate defines the contract every ecosystem adapter implements and
//! the registry the resolution engine dispatches through. Adapters register
//! themselves explicitly, either into a registry owned by the caller or into
//! the process-wide one returned by [`global`].

pub mod registry;
pub mod resolver;
pub mod retry;

// Re-export main types
pub use registry::{global, register_global, ResolverRegistry};
pub use resolver::{Availability, Resolver};
pub use retry::{with_retry, RetryConfig};

use depsweep_core::error::DepsweepError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, DepsweepError>;
