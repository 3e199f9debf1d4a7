//! The inventory client contract and a fetch helper on top of it.
//!
//! The client only moves requests and JSON bodies. Status interpretation,
//! path versioning, and request timing live in [`InventoryGateway`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error};

use crate::error::{ClientError, FetchError};
use crate::paths::VersionedPaths;

/// HTTP method of an inventory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

/// A request against an already-versioned path.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl InventoryRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }
}

/// Status plus parsed body. An empty body parses as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryResponse {
    pub status: u16,
    pub body: Value,
}

impl InventoryResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Synchronous request/response access to the inventory system.
///
/// Timeouts and retries are the implementation's concern.
pub trait InventoryClient: Send + Sync + 'static {
    fn request(
        &self,
        request: InventoryRequest,
    ) -> impl Future<Output = Result<InventoryResponse, ClientError>> + Send;
}

/// Versioned, logged access to the inventory through a client.
pub struct InventoryGateway<C> {
    client: Arc<C>,
    paths: VersionedPaths,
}

impl<C> Clone for InventoryGateway<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            paths: self.paths.clone(),
        }
    }
}

impl<C: InventoryClient> InventoryGateway<C> {
    pub fn new(client: Arc<C>, version: &str) -> Self {
        Self {
            client,
            paths: VersionedPaths::new(version),
        }
    }

    pub fn paths(&self) -> &VersionedPaths {
        &self.paths
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// GET an unversioned path.
    pub async fn get(&self, path: &str, context: &str) -> Result<Value, FetchError> {
        let versioned = self.paths.versioned(path);
        self.send(InventoryRequest::get(versioned), context).await
    }

    /// GET the record behind a related link, with an optional query suffix.
    pub async fn get_link(
        &self,
        link: &str,
        suffix: &str,
        context: &str,
    ) -> Result<Value, FetchError> {
        let Some(path) = self.paths.versioned_link(link) else {
            error!(%link, version = self.paths.version(), "inventory version not found in link");
            return Err(FetchError::BadLink {
                link: link.to_string(),
            });
        };
        self.send(InventoryRequest::get(format!("{path}{suffix}")), context)
            .await
    }

    /// Send any method to an unversioned path with an optional JSON body.
    pub async fn fetch(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        context: &str,
    ) -> Result<Value, FetchError> {
        let request = InventoryRequest {
            method,
            path: self.paths.versioned(path),
            body,
        };
        self.send(request, context).await
    }

    async fn send(&self, request: InventoryRequest, context: &str) -> Result<Value, FetchError> {
        let path = request.path.clone();
        let method = request.method;
        let started = Instant::now();
        let result = self.client.request(request).await;
        debug!(
            %context,
            method = method.as_str(),
            %path,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inventory request"
        );

        match result {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => {
                error!(%context, %path, status = response.status, "inventory request rejected");
                Err(FetchError::Rejected {
                    path,
                    status: response.status,
                })
            }
            Err(e) => {
                error!(%context, %path, error = %e, "no response from inventory");
                Err(FetchError::NoResponse(e))
            }
        }
    }
}
