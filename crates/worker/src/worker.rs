//! A worker version: lifecycle plus interceptor over shared storage.

use crate::interceptor::Interceptor;
use crate::lifecycle::{LifecycleManager, OfflinePage, WorkerState};
use crate::routes::RouteRegistry;
use phaseout_client::Network;
use phaseout_core::{AppConfig, CacheDb, Error, Request, Response};
use std::sync::Arc;

/// One worker version wired from configuration.
///
/// Requests reach the interceptor once the worker has been activated, and
/// keep doing so while it reinstalls. Before that, and after a failed first
/// install, they go straight to the network.
pub struct ServiceWorker {
    network: Arc<dyn Network>,
    lifecycle: LifecycleManager,
    interceptor: Interceptor,
}

impl ServiceWorker {
    /// Build a worker with the default routes.
    pub fn new(config: &AppConfig, storage: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let registry = RouteRegistry::default_routes(config.origin_url()?)?;
        let offline = OfflinePage::from_config(config)?;
        Ok(Self::with_registry(registry, offline, storage, network))
    }

    pub fn with_registry(
        registry: RouteRegistry, offline: OfflinePage, storage: CacheDb, network: Arc<dyn Network>,
    ) -> Self {
        let lifecycle = LifecycleManager::new(storage.clone(), Arc::clone(&network), offline.clone());
        let interceptor = Interceptor::new(registry, storage, Arc::clone(&network), offline);
        Self { network, lifecycle, interceptor }
    }

    /// Install, then activate.
    pub async fn start(&self) -> Result<(), Error> {
        self.lifecycle.install().await?;
        self.lifecycle.activate()
    }

    /// Handle one outgoing request.
    pub async fn handle(&self, request: &Request) -> Result<Response, Error> {
        if self.lifecycle.is_controlling() {
            self.interceptor.handle(request).await
        } else {
            self.network.fetch(request).await
        }
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }
}
