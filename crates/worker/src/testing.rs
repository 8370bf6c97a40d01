//! Scripted network used by the worker tests.

use async_trait::async_trait;
use http::StatusCode;
use phaseout_client::Network;
use phaseout_core::{Error, Request, Response};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use url::Url;

pub(crate) fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// In-memory network: canned responses per URL, a global offline switch,
/// and a gate tests can hold to keep fetches pending.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    responses: Mutex<HashMap<String, (StatusCode, String)>>,
    offline: AtomicBool,
    calls: Mutex<Vec<Request>>,
    gate: Arc<RwLock<()>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: &str, status: StatusCode, body: &str) {
        self.responses.lock().unwrap().insert(url.to_string(), (status, body.to_string()));
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Block every fetch until the returned guard is dropped.
    pub(crate) async fn hold(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.gate).write_owned().await
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());
        let _open = self.gate.read().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: connection refused", request.url)));
        }

        let scripted = self.responses.lock().unwrap().get(request.url.as_str()).cloned();
        match scripted {
            Some((status, body)) => Ok(Response::new(request.url.clone(), status, body)),
            None => Ok(Response::new(request.url.clone(), StatusCode::NOT_FOUND, "not found")),
        }
    }
}
