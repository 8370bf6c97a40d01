//! cache_delete tool implementation.
//!
//! Deletes a whole store and its entries.

use phaseout_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Name of the store to delete.
    pub store: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    /// Whether a store was deleted.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(cache: &CacheDb, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    if params.store.is_empty() {
        return Err(Error::InvalidInput("store cannot be empty".to_string()).into());
    }

    let deleted = cache.delete(&params.store).await?;
    tracing::info!(store = %params.store, deleted, "cache store delete requested");

    let output = CacheDeleteOutput { deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
