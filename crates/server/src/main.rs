//! phaseout server entry point.
//!
//! Boots the worker (install, then activate) and serves it as an MCP server
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use phaseout_client::{FetchClient, FetchConfig, Network};
use phaseout_core::{AppConfig, CacheDb};
use phaseout_worker::ServiceWorker;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db_path = %config.db_path.display(), "Starting phaseout worker");

    let cache = CacheDb::connect(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(ServiceWorker::new(&config, cache.clone(), network)?);

    // Requests bypass the worker until a later worker_install succeeds.
    if let Err(e) = worker.start().await {
        tracing::warn!(error = %e, "worker not activated");
    }

    let handler = handler::PhaseoutServer::new(Arc::clone(&worker), cache);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    worker.interceptor().settle().await;

    Ok(())
}
