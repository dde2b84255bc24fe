//! Version layer for toolchain selection
//!
//! This module provides the core functionality for normalizing, comparing,
//! and enumerating the toolchain/SDK versions a run sweeps over.
//!
//! # Modules
//!
//! - [`matrix`]: the declarative (toolchain, SDK) table and its lower-bound filter
//! - [`semver`]: version normalization and partial-version parsing
//! - [`error`]: error types for version parsing and matrix loading

pub mod error;
pub mod matrix;
pub mod semver;
