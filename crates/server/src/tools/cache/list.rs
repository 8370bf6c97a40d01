//! cache_list tool implementation.

use phaseout_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreListing {
    pub name: String,
    /// Request URLs of the entries, oldest write first.
    pub urls: Vec<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreListing>,
}

async fn collect(cache: &CacheDb) -> Result<CacheListOutput, Error> {
    let mut stores = Vec::new();
    for name in cache.keys().await? {
        let urls = cache.open(&name).await?.keys().await?;
        stores.push(StoreListing { name, urls: urls.iter().map(|u| u.to_string()).collect() });
    }
    Ok(CacheListOutput { stores })
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, _params: CacheListParams) -> Result<CallToolResult, McpError> {
    let output = collect(cache).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
