//! Depsweep benchmarking suite
//!
//! Benchmarks for the version algebra, the resolution engine against a
//! synthetic ecosystem, and whole-graph queries and exports.

pub mod common;

pub use common::*;
