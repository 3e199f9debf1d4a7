//! In-memory inventory client for tests and dry runs.
//!
//! Responses are registered per exact request path (query included).
//! Unregistered paths answer 404. Every request is counted so tests can
//! assert how many remote calls a code path made.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::client::{InventoryClient, InventoryRequest, InventoryResponse};
use crate::error::ClientError;

#[derive(Debug, Clone)]
enum Route {
    Respond(InventoryResponse),
    Fail,
}

#[derive(Debug, Default)]
pub struct FakeInventoryClient {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeInventoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with the given status and body.
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.set(path, Route::Respond(InventoryResponse { status, body }));
    }

    /// Answer `path` with 200 and `body`.
    pub fn respond_json(&self, path: &str, body: Value) {
        self.respond(path, 200, body);
    }

    /// Make `path` fail at the transport level.
    pub fn fail(&self, path: &str) {
        self.set(path, Route::Fail);
    }

    /// Number of requests made to `path`.
    pub fn calls(&self, path: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of requests made to any path.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    fn set(&self, path: &str, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(path.to_string(), route);
        }
    }

    fn answer(&self, request: &InventoryRequest) -> Result<InventoryResponse, ClientError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(request.path.clone()).or_insert(0) += 1;
        }
        let route = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&request.path).cloned());
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail) => Err(ClientError::Transport {
                path: request.path.clone(),
                reason: "injected failure".to_string(),
            }),
            None => Ok(InventoryResponse {
                status: 404,
                body: Value::Null,
            }),
        }
    }
}

impl InventoryClient for FakeInventoryClient {
    async fn request(&self, request: InventoryRequest) -> Result<InventoryResponse, ClientError> {
        self.answer(&request)
    }
}
