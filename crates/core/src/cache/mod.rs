//! SQLite-backed named cache stores.
//!
//! This module provides persistent request/response storage using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named stores created implicitly on first open
//! - Entries keyed by request identity (method + URL, SHA-256 hashed)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::Store;
