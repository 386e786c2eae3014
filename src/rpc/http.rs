//! HTTP adapter for the RPC contract
//!
//! Posts a JSON-RPC 2.0 envelope to `http://host:port/<path>`. The XML-RPC
//! servers on the aircraft are reached through a bridge on the same path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use super::types::{Endpoint, RpcFault, RpcReply, describe_shape};
use super::RpcClient;
use crate::error::RpcError;
use crate::{Error, Result};

/// Outgoing request envelope
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a serde_json::Value,
}

/// RPC client over HTTP
#[derive(Debug)]
pub struct HttpRpcClient {
    client: reqwest::Client,
    path: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a client whose calls give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built
    pub fn new(path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Ok(Self {
            client,
            path,
            next_id: AtomicU64::new(1),
        })
    }

    fn url_for(&self, endpoint: &Endpoint) -> Result<Url> {
        Url::parse(&format!("http://{}:{}{}", endpoint.host, endpoint.port, self.path))
            .map_err(|e| Error::Config(format!("invalid endpoint {endpoint}: {e}")))
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn call(
        &self,
        endpoint: &Endpoint,
        method: &str,
        args: &serde_json::Value,
    ) -> std::result::Result<RpcReply, RpcError> {
        let url = self
            .url_for(endpoint)
            .map_err(|e| RpcError::Unreachable(e.to_string()))?;

        let envelope = Envelope {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: args,
        };

        tracing::trace!(%endpoint, method, id = envelope.id, "rpc call");

        let response = self
            .client
            .post(url)
            .json(&envelope)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        // A gateway error from the bridge means the node behind it never answered
        if matches!(status.as_u16(), 502..=504) {
            return Err(RpcError::Unreachable(format!("bridge returned {status}")));
        }

        decode_envelope(&body)
    }
}

fn classify_transport(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout
    } else {
        RpcError::Unreachable(e.to_string())
    }
}

/// Decode a JSON-RPC response body into the three-way reply
///
/// # Errors
///
/// Returns `RpcError::Malformed` if the body is not a response envelope
pub fn decode_envelope(body: &str) -> std::result::Result<RpcReply, RpcError> {
    if body.trim().is_empty() {
        return Ok(RpcReply::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| RpcError::Malformed {
            shape: "non-JSON body".to_string(),
        })?;

    let Some(object) = value.as_object() else {
        return Err(RpcError::Malformed {
            shape: describe_shape(&value).to_string(),
        });
    };

    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
        let code = error
            .get("code")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or_default();
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| error.to_string(), ToString::to_string);
        return Ok(RpcReply::Fault(RpcFault { code, message }));
    }

    match object.get("result") {
        Some(serde_json::Value::Null) => Ok(RpcReply::Empty),
        Some(result) => Ok(RpcReply::Value(result.clone())),
        None => Err(RpcError::Malformed {
            shape: "object without result or error".to_string(),
        }),
    }
}
