//! Core types and shared functionality for phaseout.
//!
//! This crate provides:
//! - Named cache stores with a SQLite backend
//! - Request/response snapshots
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod message;

pub use cache::{CacheDb, Store};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use message::{Request, Response};
