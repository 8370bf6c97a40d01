//! cache_get tool implementation.
//!
//! Retrieves the entry a store holds for a GET request.

use phaseout_client::resolve;
use phaseout_core::{CacheDb, Error, Request};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tools::worker_fetch::WorkerFetchOutput;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Name of the store to look in.
    pub store: String,

    /// URL of the cached GET request. Relative URLs resolve against the worker origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Store the entry was found in.
    pub store: String,
    /// The cached response.
    pub entry: WorkerFetchOutput,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    if !cache.has(&params.store).await? {
        return Err(Error::CacheMiss(format!("no store named {}", params.store)).into());
    }

    let store = cache.open(&params.store).await?;
    let entry = store
        .match_request(&Request::get(url.clone()))
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{url} in {}", params.store)))?;

    let output = CacheGetOutput { store: params.store, entry: entry.into() };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use phaseout_core::Response;

    fn origin() -> Url {
        Url::parse("https://phaseout.example/").unwrap()
    }

    #[tokio::test]
    async fn test_get_impl_missing_store() {
        let cache = CacheDb::connect_in_memory().await.unwrap();
        let params = CacheGetParams { store: "offline".into(), url: "offline.html".into() };

        let result = get_impl(&cache, &origin(), params).await;
        assert!(result.is_err());
        assert!(!cache.has("offline").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_impl_missing_entry() {
        let cache = CacheDb::connect_in_memory().await.unwrap();
        cache.open("offline").await.unwrap();
        let params = CacheGetParams { store: "offline".into(), url: "offline.html".into() };

        let result = get_impl(&cache, &origin(), params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = CacheDb::connect_in_memory().await.unwrap();
        let url = origin().join("offline.html").unwrap();
        let store = cache.open("offline").await.unwrap();
        store
            .put(&Request::get(url.clone()), &Response::new(url, StatusCode::OK, "offline"))
            .await
            .unwrap();

        let params = CacheGetParams { store: "offline".into(), url: "/offline.html".into() };
        let result = get_impl(&cache, &origin(), params).await;
        assert!(result.is_ok());
    }
}
