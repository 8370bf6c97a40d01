//! Network access for phaseout.
//!
//! This crate provides the `Network` seam the worker fetches through and
//! its reqwest-backed implementation.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, resolve};
