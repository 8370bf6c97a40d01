//! worker_fetch tool implementation.
//!
//! Sends one request through the worker, exactly as a controlled page would.

use http::Method;
use phaseout_client::resolve;
use phaseout_core::{Error, Request, Response};
use phaseout_worker::ServiceWorker;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// The URL to request. Relative URLs resolve against the worker origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached or replaced
    /// by the offline page.
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body for non-GET requests.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// URL the response was served from.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Response body, decoded as UTF-8 (lossy).
    pub body: String,
}

impl From<Response> for WorkerFetchOutput {
    fn from(response: Response) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            content_type: response.content_type().map(str::to_string),
            headers: response
                .headers
                .iter()
                .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
                .collect(),
            body: String::from_utf8_lossy(&response.body).to_string(),
        }
    }
}

/// Build the request described by `params`.
fn build_request(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<Request, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let method = Method::from_bytes(params.method.trim().to_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", params.method)))?;
    let url = resolve(worker.interceptor().registry().origin(), &params.url)
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(method, url);
    if let Some(body) = params.body {
        if request.is_get() {
            return Err(Error::InvalidInput("GET requests cannot have a body".into()));
        }
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, params)?;
    let response = worker.handle(&request).await?;

    let output = WorkerFetchOutput::from(response);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
