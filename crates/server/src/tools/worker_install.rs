//! worker_install tool implementation.
//!
//! Reinstalls and activates the worker, refreshing the cached offline page.

use phaseout_core::Error;
use phaseout_worker::ServiceWorker;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {}

/// Output structure for worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    /// Lifecycle state after installing.
    pub state: String,
    /// URL of the cached offline page.
    pub offline_url: String,
    /// Store holding the offline page.
    pub offline_store: String,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &ServiceWorker, _params: WorkerInstallParams) -> Result<CallToolResult, McpError> {
    worker.start().await?;

    let offline = worker.lifecycle().offline_page();
    let output = WorkerInstallOutput {
        state: worker.state().to_string(),
        offline_url: offline.url().to_string(),
        offline_store: offline.store.clone(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
