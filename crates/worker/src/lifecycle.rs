//! Install lifecycle.
//!
//! Installing a worker version pre-caches the offline fallback page. Until
//! that write has finished the version is not ready to activate. If the page
//! cannot be fetched on the first install the version becomes redundant and
//! never activates; a failed reinstall keeps the version that was serving.

use phaseout_client::Network;
use phaseout_core::{AppConfig, CacheDb, Error, Request};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use url::Url;

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, install not attempted yet.
    Parsed,
    /// Install in progress.
    Installing,
    /// Offline page cached; waiting to activate.
    Installed,
    /// Controlling requests.
    Activated,
    /// Install failed; this version never activates.
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Where the offline fallback page comes from and where it is kept.
#[derive(Debug, Clone)]
pub struct OfflinePage {
    /// Store holding the page.
    pub store: String,
    /// Request used both to fetch the page and as its key in the store.
    pub request: Request,
}

impl OfflinePage {
    pub fn new(store: impl Into<String>, url: Url) -> Self {
        Self { store: store.into(), request: Request::get(url) }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self::new(config.offline_store.clone(), config.offline_url()?))
    }

    pub fn url(&self) -> &Url {
        &self.request.url
    }
}

/// Drives install and activation for one worker version.
pub struct LifecycleManager {
    storage: CacheDb,
    network: Arc<dyn Network>,
    offline: OfflinePage,
    state: RwLock<WorkerState>,
    /// Set by the first successful activation; a later install never clears it.
    controlling: AtomicBool,
}

impl LifecycleManager {
    pub fn new(storage: CacheDb, network: Arc<dyn Network>, offline: OfflinePage) -> Self {
        Self {
            storage,
            network,
            offline,
            state: RwLock::new(WorkerState::Parsed),
            controlling: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether requests go through the interceptor.
    ///
    /// Stays true while an activated worker reinstalls, whatever the outcome.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
        tracing::debug!(%state, "worker state changed");
    }

    pub fn offline_page(&self) -> &OfflinePage {
        &self.offline
    }

    /// Fetch the offline page and store it.
    ///
    /// Returns only after the store write has completed. There is no retry.
    /// A failed first install leaves the worker `Redundant`; a failed
    /// reinstall restores the previous `Installed` or `Activated` state.
    pub async fn install(&self) -> Result<(), Error> {
        let previous = {
            let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            if *state == WorkerState::Installing {
                return Err(Error::InvalidState("install already in progress".into()));
            }
            std::mem::replace(&mut *state, WorkerState::Installing)
        };

        match self.cache_offline_page().await {
            Ok(()) => {
                self.set_state(WorkerState::Installed);
                Ok(())
            }
            Err(e) => {
                let restored = match previous {
                    WorkerState::Installed | WorkerState::Activated => previous,
                    _ => WorkerState::Redundant,
                };
                self.set_state(restored);
                tracing::error!(url = %self.offline.url(), error = %e, "install failed");
                Err(Error::InstallFailed(format!("{}: {e}", self.offline.url())))
            }
        }
    }

    async fn cache_offline_page(&self) -> Result<(), Error> {
        let response = self.network.fetch(&self.offline.request).await?;
        if !response.ok() {
            tracing::warn!(
                url = %self.offline.url(),
                status = response.status.as_u16(),
                "offline page responded with an error status; caching it anyway"
            );
        }

        let store = self.storage.open(&self.offline.store).await?;
        store.put(&self.offline.request, &response).await?;

        tracing::info!(url = %response.url, store = %self.offline.store, "cached offline page");
        Ok(())
    }

    /// Move an installed worker to `Activated`.
    pub fn activate(&self) -> Result<(), Error> {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        match *state {
            WorkerState::Installed => {
                *state = WorkerState::Activated;
                self.controlling.store(true, Ordering::Release);
                tracing::info!("worker activated");
                Ok(())
            }
            WorkerState::Activated => Ok(()),
            other => Err(Error::InvalidState(format!("cannot activate a {other} worker"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedNetwork, url};
    use http::StatusCode;

    const OFFLINE: &str = "https://phaseout.example/offline.html";

    async fn manager(network: Arc<ScriptedNetwork>) -> (LifecycleManager, CacheDb) {
        let db = CacheDb::connect_in_memory().await.unwrap();
        let offline = OfflinePage::new("offline", url(OFFLINE));
        (LifecycleManager::new(db.clone(), network, offline), db)
    }

    #[tokio::test]
    async fn test_install_caches_offline_page() {
        let network = ScriptedNetwork::new();
        network.respond(OFFLINE, StatusCode::OK, "<h1>You are offline</h1>");
        let (lifecycle, db) = manager(network).await;

        lifecycle.install().await.unwrap();
        assert_eq!(lifecycle.state(), WorkerState::Installed);

        let store = db.open("offline").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec![url(OFFLINE)]);
        let entry = store.match_request(&Request::get(url(OFFLINE))).await.unwrap().unwrap();
        assert_eq!(entry.body, "<h1>You are offline</h1>");
    }

    #[tokio::test]
    async fn test_reinstall_keeps_single_entry() {
        let network = ScriptedNetwork::new();
        network.respond(OFFLINE, StatusCode::OK, "old");
        let (lifecycle, db) = manager(Arc::clone(&network)).await;
        lifecycle.install().await.unwrap();

        network.respond(OFFLINE, StatusCode::OK, "new");
        lifecycle.install().await.unwrap();

        let store = db.open("offline").await.unwrap();
        assert_eq!(store.keys().await.unwrap().len(), 1);
        let entry = store.match_request(&Request::get(url(OFFLINE))).await.unwrap().unwrap();
        assert_eq!(entry.body, "new");
    }

    #[tokio::test]
    async fn test_install_failure_leaves_store_empty() {
        let network = ScriptedNetwork::new();
        network.set_offline(true);
        let (lifecycle, db) = manager(network).await;

        let err = lifecycle.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(_)));
        assert_eq!(lifecycle.state(), WorkerState::Redundant);
        assert!(!db.has("offline").await.unwrap());
    }

    #[tokio::test]
    async fn test_install_stores_error_status_page() {
        let network = ScriptedNetwork::new();
        let (lifecycle, db) = manager(network).await;

        lifecycle.install().await.unwrap();

        let store = db.open("offline").await.unwrap();
        let entry = store.match_request(&Request::get(url(OFFLINE))).await.unwrap().unwrap();
        assert_eq!(entry.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let network = ScriptedNetwork::new();
        network.respond(OFFLINE, StatusCode::OK, "offline");
        let (lifecycle, _db) = manager(network).await;

        assert!(matches!(lifecycle.activate(), Err(Error::InvalidState(_))));

        lifecycle.install().await.unwrap();
        lifecycle.activate().unwrap();
        assert_eq!(lifecycle.state(), WorkerState::Activated);
        assert!(lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_failed_reinstall_restores_previous_state() {
        let network = ScriptedNetwork::new();
        network.respond(OFFLINE, StatusCode::OK, "offline");
        let (lifecycle, db) = manager(Arc::clone(&network)).await;
        lifecycle.install().await.unwrap();

        network.set_offline(true);
        assert!(matches!(lifecycle.install().await, Err(Error::InstallFailed(_))));
        assert_eq!(lifecycle.state(), WorkerState::Installed);

        network.set_offline(false);
        lifecycle.activate().unwrap();
        network.set_offline(true);
        assert!(matches!(lifecycle.install().await, Err(Error::InstallFailed(_))));
        assert_eq!(lifecycle.state(), WorkerState::Activated);
        assert!(lifecycle.is_controlling());

        let store = db.open("offline").await.unwrap();
        let entry = store.match_request(&Request::get(url(OFFLINE))).await.unwrap().unwrap();
        assert_eq!(entry.body, "offline");
    }

    #[tokio::test]
    async fn test_redundant_worker_cannot_activate() {
        let network = ScriptedNetwork::new();
        network.set_offline(true);
        let (lifecycle, _db) = manager(network).await;

        lifecycle.install().await.unwrap_err();
        assert!(matches!(lifecycle.activate(), Err(Error::InvalidState(_))));
        assert!(!lifecycle.is_controlling());
    }

    #[test]
    fn test_offline_page_from_config() {
        let config = AppConfig { origin: "https://phaseout.example/".into(), ..Default::default() };
        let page = OfflinePage::from_config(&config).unwrap();
        assert_eq!(page.store, "offline");
        assert_eq!(page.url().as_str(), OFFLINE);
        assert!(page.request.is_get());
    }
}
