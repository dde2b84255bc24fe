//! Build-tool invocation layer
//!
//! This module drives the external build tool and owns the sweep itself.
//!
//! # Modules
//!
//! - [`invoker`]: `BuildInvoker` trait and the command-backed implementation
//! - [`runner`]: the sequential matrix loop with fail-fast semantics

pub mod invoker;
pub mod runner;
