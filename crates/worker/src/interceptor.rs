//! Request interceptor.
//!
//! Every outgoing request the worker controls passes through [`Interceptor::handle`]:
//!
//! 1. Non-GET requests go to the network untouched. No store is read or written.
//! 2. GET requests matching a route are answered by that route's strategy.
//! 3. Other GET requests go to the network.
//! 4. When the network cannot be reached for a GET request, the offline
//!    fallback page is served instead. Without one, the network error
//!    propagates.

use crate::background::BackgroundTasks;
use crate::lifecycle::OfflinePage;
use crate::routes::{RouteRegistry, RouteRule};
use crate::strategy::StrategyContext;
use phaseout_client::Network;
use phaseout_core::{CacheDb, Error, Request, Response};
use std::sync::Arc;

/// Policy point for outgoing requests.
pub struct Interceptor {
    registry: RouteRegistry,
    storage: CacheDb,
    network: Arc<dyn Network>,
    offline: OfflinePage,
    background: BackgroundTasks,
}

impl Interceptor {
    pub fn new(registry: RouteRegistry, storage: CacheDb, network: Arc<dyn Network>, offline: OfflinePage) -> Self {
        Self { registry, storage, network, offline, background: BackgroundTasks::new() }
    }

    /// Produce a response for `request`.
    pub async fn handle(&self, request: &Request) -> Result<Response, Error> {
        if !request.is_get() {
            tracing::trace!(method = %request.method, url = %request.url, "passing through");
            return self.network.fetch(request).await;
        }

        let result = match self.registry.match_url(&request.url) {
            Some(rule) => self.apply(rule, request).await,
            None => self.network.fetch(request).await,
        };

        match result {
            Err(err) if err.is_network() => self.offline_fallback(request, err).await,
            other => other,
        }
    }

    async fn apply(&self, rule: &RouteRule, request: &Request) -> Result<Response, Error> {
        let store = match self.storage.open(&rule.store).await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(store = %rule.store, error = %e, "store unavailable; using network");
                return self.network.fetch(request).await;
            }
        };

        tracing::debug!(url = %request.url, store = %rule.store, strategy = rule.strategy.name(), "route matched");
        let ctx = StrategyContext { store, network: Arc::clone(&self.network), background: self.background.clone() };
        rule.strategy.respond(&ctx, request).await
    }

    /// Serve the offline page in place of a failed fetch, or give back `err`.
    async fn offline_fallback(&self, request: &Request, err: Error) -> Result<Response, Error> {
        tracing::error!(url = %request.url, error = %err, "fetch failed; serving cached offline fallback");

        let store = match self.storage.open(&self.offline.store).await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(store = %self.offline.store, error = %e, "offline store unavailable");
                return Err(err);
            }
        };

        match store.match_request(&self.offline.request).await {
            Ok(Some(page)) => Ok(page),
            Ok(None) => {
                tracing::warn!(url = %self.offline.url(), "no offline fallback cached");
                Err(err)
            }
            Err(e) => {
                tracing::warn!(url = %self.offline.url(), error = %e, "offline fallback lookup failed");
                Err(err)
            }
        }
    }

    /// Wait for all pending background refreshes.
    pub async fn settle(&self) {
        self.background.settle().await;
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }
}
