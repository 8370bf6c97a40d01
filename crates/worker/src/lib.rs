//! The request-interception caching worker.
//!
//! This crate provides:
//! - A route registry mapping URL matchers to caching strategies and stores
//! - Stale-while-revalidate, cache-first and network-only strategies
//! - The install lifecycle that pre-caches the offline fallback page
//! - The interceptor every outgoing request passes through

pub mod background;
pub mod interceptor;
pub mod lifecycle;
pub mod routes;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use background::BackgroundTasks;
pub use interceptor::Interceptor;
pub use lifecycle::{LifecycleManager, OfflinePage, WorkerState};
pub use routes::{Matcher, RouteRegistry, RouteRule};
pub use strategy::{CacheFirst, NetworkOnly, StaleWhileRevalidate, Strategy, StrategyContext};
pub use worker::ServiceWorker;
