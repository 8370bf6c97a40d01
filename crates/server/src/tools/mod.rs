//! MCP tool implementations.
//!
//! This module contains all tools exposed by the phaseout server.
#![allow(unused_imports)]

pub mod cache;
pub mod worker_fetch;
pub mod worker_install;

#[cfg(test)]
pub(crate) mod test_support;

pub use worker_fetch::{WorkerFetchOutput, WorkerFetchParams};
pub use worker_install::{WorkerInstallOutput, WorkerInstallParams};
