//! Caching strategies.
//!
//! A strategy decides, for one request, how the matched store and the
//! network are combined into a response. Writes are best effort: a store
//! failure is logged and never turns a successful network response into an
//! error.

use crate::background::BackgroundTasks;
use async_trait::async_trait;
use http::StatusCode;
use phaseout_client::Network;
use phaseout_core::{Error, Request, Response, Store};
use std::sync::Arc;

/// What a strategy gets to work with for one request.
#[derive(Clone)]
pub struct StrategyContext {
    /// The store named by the matched route, already opened.
    pub store: Store,
    pub network: Arc<dyn Network>,
    pub background: BackgroundTasks,
}

/// A caching strategy bound to routes in the registry.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Produce the response for `request`.
    async fn respond(&self, ctx: &StrategyContext, request: &Request) -> Result<Response, Error>;
}

/// Only complete 200 responses are worth keeping.
fn is_cacheable(response: &Response) -> bool {
    response.status == StatusCode::OK
}

/// Look up `request`, treating a storage failure as a miss.
async fn cached(store: &Store, request: &Request) -> Option<Response> {
    match store.match_request(request).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(store = %store.name(), url = %request.url, error = %e, "cache lookup failed");
            None
        }
    }
}

/// Fetch `request` and write the response to `store` if it is cacheable.
///
/// Network failures propagate; store failures are logged.
async fn fetch_and_put(network: &dyn Network, store: &Store, request: &Request) -> Result<Response, Error> {
    let response = network.fetch(request).await?;

    if is_cacheable(&response) {
        if let Err(e) = store.put(request, &response).await {
            tracing::warn!(store = %store.name(), url = %request.url, error = %e, "cache write failed");
        }
    } else {
        tracing::debug!(
            store = %store.name(),
            url = %request.url,
            status = response.status.as_u16(),
            "not caching response"
        );
    }

    Ok(response)
}

/// Serve the cached entry immediately when there is one and refresh it in
/// the background; otherwise wait for the network and cache the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaleWhileRevalidate;

#[async_trait]
impl Strategy for StaleWhileRevalidate {
    fn name(&self) -> &'static str {
        "stale-while-revalidate"
    }

    async fn respond(&self, ctx: &StrategyContext, request: &Request) -> Result<Response, Error> {
        match cached(&ctx.store, request).await {
            Some(response) => {
                let network = Arc::clone(&ctx.network);
                let store = ctx.store.clone();
                let request = request.clone();
                ctx.background.spawn(format!("refresh {}", request.url), async move {
                    fetch_and_put(network.as_ref(), &store, &request).await.map(|_| ())
                });
                tracing::debug!(store = %ctx.store.name(), url = %response.url, "serving cached entry");
                Ok(response)
            }
            None => fetch_and_put(ctx.network.as_ref(), &ctx.store, request).await,
        }
    }
}

/// Serve the cached entry when there is one; go to the network only on a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFirst;

#[async_trait]
impl Strategy for CacheFirst {
    fn name(&self) -> &'static str {
        "cache-first"
    }

    async fn respond(&self, ctx: &StrategyContext, request: &Request) -> Result<Response, Error> {
        match cached(&ctx.store, request).await {
            Some(response) => Ok(response),
            None => fetch_and_put(ctx.network.as_ref(), &ctx.store, request).await,
        }
    }
}

/// Always use the network and never touch the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkOnly;

#[async_trait]
impl Strategy for NetworkOnly {
    fn name(&self) -> &'static str {
        "network-only"
    }

    async fn respond(&self, ctx: &StrategyContext, request: &Request) -> Result<Response, Error> {
        ctx.network.fetch(request).await
    }
}
