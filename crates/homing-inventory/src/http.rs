//! HTTP/1 inventory client over hyper.
//!
//! One connection per attempt; the connection task is driven in the
//! background for the lifetime of the request. Connection failures and
//! timeouts are retried up to the configured budget, HTTP statuses are
//! returned as-is for the gateway to interpret.

use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use homing_core::InventoryConfig;

use crate::client::{InventoryClient, InventoryRequest, InventoryResponse};
use crate::error::ClientError;

const USER_AGENT: &str = "homing-inventory/0.1";

#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    /// `host:port` to connect to.
    address: String,
    host: String,
    /// Path prefix from the server URL, without trailing slash.
    base_path: String,
    from_app_id: String,
    authorization: Option<String>,
    timeout: Duration,
    retries: u32,
}

impl HttpInventoryClient {
    pub fn from_config(config: &InventoryConfig) -> Result<Self, ClientError> {
        let url = Url::parse(config.base_url())
            .map_err(|e| ClientError::InvalidRequest(format!("server_url: {e}")))?;
        if url.scheme() != "http" {
            return Err(ClientError::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::InvalidRequest("server_url has no host".to_string()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let authorization = (!config.username.is_empty()).then(|| {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", config.username, config.password));
            format!("Basic {token}")
        });

        Ok(Self {
            address: format!("{host}:{port}"),
            host,
            base_path: url.path().trim_end_matches('/').to_string(),
            from_app_id: config.from_app_id.clone(),
            authorization,
            timeout: config.timeout(),
            retries: config.retries,
        })
    }

    fn uri(&self, path: &str) -> String {
        format!("http://{}{}{}", self.address, self.base_path, path)
    }

    async fn attempt(&self, request: &InventoryRequest) -> Result<InventoryResponse, ClientError> {
        let uri = self.uri(&request.path);
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| ClientError::Connect {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ClientError::Connect {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "inventory connection closed with error");
            }
        });

        let body = match &request.body {
            Some(json) => Bytes::from(
                serde_json::to_vec(json).map_err(|e| ClientError::InvalidRequest(e.to_string()))?,
            ),
            None => Bytes::new(),
        };

        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(&uri)
            .header("host", &self.host)
            .header("user-agent", USER_AGENT)
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("X-FromAppId", &self.from_app_id)
            .header("X-TransactionId", Uuid::new_v4().to_string());
        if let Some(auth) = &self.authorization {
            builder = builder.header("authorization", auth);
        }
        let req = builder
            .body(Full::new(body))
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ClientError::Transport {
                path: request.path.clone(),
                reason: e.to_string(),
            })?;
        let status = resp.status().as_u16();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport {
                path: request.path.clone(),
                reason: e.to_string(),
            })?
            .to_bytes();

        let body = decode_body(&bytes, status).map_err(|e| ClientError::Decode {
            path: request.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(InventoryResponse { status, body })
    }
}

/// Empty bodies parse as `Null`. A non-JSON body is an error only on
/// success; error pages are passed through as `Null`.
fn decode_body(bytes: &[u8], status: u16) -> Result<Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(_) if status != 200 => Ok(Value::Null),
        Err(e) => Err(e),
    }
}

fn retryable(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::Connect { .. } | ClientError::Timeout { .. } | ClientError::Transport { .. }
    )
}

impl InventoryClient for HttpInventoryClient {
    async fn request(&self, request: InventoryRequest) -> Result<InventoryResponse, ClientError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.attempt(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout {
                    path: request.path.clone(),
                }),
            };
            match result {
                Err(e) if retryable(&e) && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, retries = self.retries, path = %request.path, "retrying inventory request");
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> InventoryConfig {
        InventoryConfig {
            server_url: url.to_string(),
            ..InventoryConfig::default()
        }
    }

    #[test]
    fn http_url_is_split_into_address_and_prefix() {
        let client = HttpInventoryClient::from_config(&config("http://inventory:8080/aai/")).unwrap();
        assert_eq!(client.address, "inventory:8080");
        assert_eq!(client.uri("/v14/network/zones"), "http://inventory:8080/aai/v14/network/zones");
        assert!(client.authorization.is_none());
    }

    #[test]
    fn https_is_rejected() {
        let err = HttpInventoryClient::from_config(&config("https://inventory:8443/aai")).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedScheme(s) if s == "https"));
    }

    #[test]
    fn basic_auth_header_is_built() {
        let cfg = InventoryConfig {
            username: "homing".to_string(),
            password: "secret".to_string(),
            ..config("http://inventory/aai")
        };
        let client = HttpInventoryClient::from_config(&cfg).unwrap();
        assert_eq!(client.address, "inventory:80");
        assert_eq!(client.authorization.as_deref(), Some("Basic aG9taW5nOnNlY3JldA=="));
    }

    #[test]
    fn body_decoding() {
        assert_eq!(decode_body(b"", 200).unwrap(), Value::Null);
        assert_eq!(decode_body(b"{\"a\":1}", 200).unwrap()["a"], 1);
        assert_eq!(decode_body(b"<html>", 500).unwrap(), Value::Null);
        assert!(decode_body(b"<html>", 200).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_fails_after_retries() {
        let cfg = InventoryConfig {
            retries: 1,
            timeout_secs: 2,
            ..config("http://127.0.0.1:1/aai")
        };
        let client = HttpInventoryClient::from_config(&cfg).unwrap();
        let err = client
            .request(InventoryRequest::get("/v14/network/zones"))
            .await
            .unwrap_err();
        assert!(retryable(&err));
    }
}
