//! Shared fixtures for tool tests.

use phaseout_client::{FetchClient, FetchConfig, Network};
use phaseout_core::{AppConfig, CacheDb};
use phaseout_worker::ServiceWorker;
use std::sync::Arc;
use std::time::Duration;

/// A worker whose origin nothing listens on.
pub(crate) async fn worker() -> (ServiceWorker, CacheDb) {
    let config = AppConfig { origin: "http://127.0.0.1:9/".into(), timeout_ms: 1000, ..Default::default() };
    let db = CacheDb::connect_in_memory().await.unwrap();
    let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(1000), ..Default::default() }).unwrap();
    let network: Arc<dyn Network> = Arc::new(client);
    let worker = ServiceWorker::new(&config, db.clone(), network).unwrap();
    (worker, db)
}
