//! buildsweep: a CI build wrapper that sweeps a toolchain/SDK version matrix.
//!
//! Given an ordered matrix of (toolchain version, SDK version) pairs, the
//! runner filters out entries below a configured lower bound, then for each
//! remaining entry terminates stale helper processes, switches the active
//! toolchain via an external selector binary, and invokes the build tool.
//! The first non-zero build exit aborts the whole run.
//!
//! # Modules
//!
//! - [`config`]: run configuration, tool paths, data/log directories
//! - [`version`]: version normalization, comparison, and the build matrix
//! - [`toolchain`]: toolchain enumeration and switching
//! - [`build`]: build-tool invocation and the matrix loop
//! - [`process`]: stale-process cleanup with a bounded deadline

pub mod build;
pub mod config;
pub mod process;
pub mod toolchain;
pub mod version;
