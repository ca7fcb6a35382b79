//! Error types and result aliases for depsweep operations.
//!
//! Provides a unified error type that covers every failure the resolution
//! stack can surface, with actionable error messages. Most of these are
//! contained to a single dependency edge by the engine; only configuration
//! and cache-backend errors are fatal to a run.

use thiserror::Error;

/// Unified error type for all depsweep operations
#[derive(Error, Debug)]
pub enum DepsweepError {
    // Version algebra errors
    #[error("Invalid version specification '{input}': {reason}")]
    InvalidSpecification { input: String, reason: String },

    #[error("Version specs '{left}' and '{right}' have no version in common")]
    Unsatisfiable { left: String, right: String },

    // Resolver errors
    #[error("Resolver '{resolver}' could not reach its backend: {message}")]
    BackendUnavailable {
        resolver: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No resolver named '{name}' is registered")]
    UnknownResolver { name: String },

    #[error("A resolver named '{name}' is already registered")]
    DuplicateResolver { name: String },

    #[error("No resolver can resolve the source repository at {path}")]
    NoSourceResolver { path: String },

    #[error("Resolution was cancelled")]
    Cancelled,

    // Config errors
    #[error("Failed to parse depsweep.toml: {message}")]
    ConfigParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Cache errors
    #[error("Cache backend error: {message}")]
    CacheBackend { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for depsweep operations
pub type DepsweepResult<T> = Result<T, DepsweepError>;

impl DepsweepError {
    /// Create an invalid specification error
    pub fn invalid_spec(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error without an underlying cause
    pub fn backend(resolver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            resolver: resolver.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error from any error type
    pub fn backend_from<E>(resolver: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendUnavailable {
            resolver: resolver.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error should only affect a single dependency edge
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DepsweepError::InvalidSpecification { .. }
                | DepsweepError::BackendUnavailable { .. }
                | DepsweepError::Unsatisfiable { .. }
                | DepsweepError::Cancelled
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            DepsweepError::InvalidSpecification { .. } => {
                Some("Check the version constraint syntax for this ecosystem")
            },
            DepsweepError::BackendUnavailable { .. } => {
                Some("Check that the ecosystem tool or registry is reachable and try again")
            },
            DepsweepError::UnknownResolver { .. } => {
                Some("List the registered resolvers and use one of their names")
            },
            DepsweepError::NoSourceResolver { .. } => {
                Some("Make sure the directory contains a manifest a registered resolver understands")
            },
            DepsweepError::CacheBackend { .. } => {
                Some("Clear the cache or point the cache path at a writable location")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(DepsweepError::invalid_spec(">>1", "bad operator").is_recoverable());
        assert!(DepsweepError::backend("pip", "timeout").is_recoverable());
        assert!(!DepsweepError::UnknownResolver {
            name: "nope".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_backend_error_keeps_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "npm not installed");
        let err = DepsweepError::backend_from("npm", "failed to run npm", io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("npm"));
        assert!(err.suggestion().is_some());
    }
}
