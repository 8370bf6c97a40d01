//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::cache::{CacheDeleteParams, CacheGetParams, CacheListParams, delete_impl, get_impl, list_impl};
use crate::tools::worker_fetch::{WorkerFetchParams, fetch_impl};
use crate::tools::worker_install::{WorkerInstallParams, install_impl};

use phaseout_core::CacheDb;
use phaseout_worker::ServiceWorker;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for phaseout.
#[derive(Clone)]
pub struct PhaseoutServer {
    worker: Arc<ServiceWorker>,
    cache: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PhaseoutServer {
    /// Create a new server handler around a started worker.
    pub fn new(worker: Arc<ServiceWorker>, cache: CacheDb) -> Self {
        Self { worker, cache, tool_router: Self::tool_router() }
    }

    /// Send a request through the worker.
    #[tool(
        description = "Fetch a URL through the offline-capable worker. GET requests may be served from cache or replaced by the offline page when the network is down."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Reinstall the worker.
    #[tool(description = "Reinstall and activate the worker, re-caching the offline fallback page.")]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker, params.0).await
    }

    /// Look up a cached entry.
    #[tool(description = "Get the cached response a store holds for a URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.cache, self.worker.interceptor().registry().origin(), params.0).await
    }

    /// Delete a store.
    #[tool(description = "Delete a cache store and all of its entries.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.cache, params.0).await
    }

    /// List stores.
    #[tool(description = "List cache stores and the URLs each one holds.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.cache, params.0).await
    }
}

impl ServerHandler for PhaseoutServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "phaseout".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
